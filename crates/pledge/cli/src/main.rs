fn main() {
    if let Err(err) = pledge_cli::run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
