mod command;
mod format;
mod tui;
mod util;

fn main() -> anyhow::Result<()> {
    command::run()
}
