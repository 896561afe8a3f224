fn main() -> Result<(), eframe::Error> {
    // RUST_LOG controls verbosity, e.g. RUST_LOG=flow_editor=debug
    env_logger::init();

    flow_editor::run_app()
}
