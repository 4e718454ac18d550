mod app;
mod settings;

use std::process;

use app::App;
use srtforge_core::job::coordinator;

fn main() -> iced::Result {
    env_logger::init();

    // Re-invocations of this binary as a job worker divert here.
    if coordinator::worker_requested() {
        process::exit(coordinator::run_worker());
    }

    iced::application(App::new, App::update, App::view)
        .title("SrtForge")
        .subscription(App::subscription)
        .window(iced::window::Settings {
            size: iced::Size::new(560.0, 540.0),
            ..Default::default()
        })
        .run()
}
