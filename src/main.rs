fn main() {
    if let Err(err) = flowkit::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
