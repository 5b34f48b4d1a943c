use anyhow::Result;

mod app;
mod logging;

fn main() -> Result<()> {
    let args = archive_rename::cli::parse();
    app::run(args)
}
