use bevy_app::{App, AppExit};
use bevy_log::LogPlugin;
use std::path::PathBuf;
use tracing::error;

mod scan;

fn main() -> AppExit {
    let mut app = App::new();
    app.add_plugins(LogPlugin::default());

    let path = std::env::args().nth(1).map(PathBuf::from);
    let plugin = match scan::ScanPlugin::load(path.as_deref()) {
        Ok(plugin) => plugin,
        Err(err) => {
            error!("{err:#}");
            return AppExit::error();
        }
    };

    app.add_plugins(plugin).run()
}
