use ar_sketch::{InputEvent, SketchApp, SketchConfig};
use ar_sketch::stroke::StrokeColor;
use std::env;
use std::path::PathBuf;

const FRAME_DELTA: f32 = 1.0 / 60.0;

/// (frame, event) pairs replayed against a simulated tracker.
const SCRIPT: &[(u32, ScriptedEvent)] = &[
    (5, ScriptedEvent::Touch),
    (45, ScriptedEvent::Release),
    (50, ScriptedEvent::Color(0.0)),
    (55, ScriptedEvent::Touch),
    (95, ScriptedEvent::Release),
    (100, ScriptedEvent::Color(0.6)),
    (105, ScriptedEvent::Touch),
    (150, ScriptedEvent::Release),
];

const FRAMES: u32 = 160;

#[derive(Clone, Copy)]
enum ScriptedEvent {
    Touch,
    Release,
    Color(f32),
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("[replay] error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let output_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("drawings/replay.json"));
    let config = match env::args().nth(2) {
        Some(path) => SketchConfig::from_json_file(&PathBuf::from(path))?,
        None => SketchConfig::default(),
    };

    let mut app = SketchApp::new(config);
    for frame in 0..FRAMES {
        for (_, event) in SCRIPT.iter().filter(|(at, _)| *at == frame) {
            let input = match *event {
                ScriptedEvent::Touch => InputEvent::TouchBegan,
                ScriptedEvent::Release => InputEvent::TouchEnded,
                ScriptedEvent::Color(slider) => {
                    InputEvent::ColorChanged(StrokeColor::from_slider(slider))
                }
            };
            let ui = app.handle_input(input);
            log::debug!("[replay] frame {frame}: {:?} -> {}", input, ui.status_text);
        }
        app.tick(FRAME_DELTA);
    }

    let drawing = app.export();
    drawing.write_to(&output_path)?;
    println!(
        "[replay] wrote {} strokes ({} points) to {}",
        drawing.strokes.len(),
        drawing.total_points(),
        output_path.display()
    );
    println!("{}", app.telemetry().to_json()?);
    Ok(())
}
