fn main() {
    if let Err(err) = matrixscan_lib::run() {
        eprintln!("matrixscan: {err:#}");
        std::process::exit(1);
    }
}
