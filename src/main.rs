fn main() {
    if let Err(e) = vault_navigator::app::run() {
        log::error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
