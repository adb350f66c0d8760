fn main() {
    std::process::exit(srex::cli::run());
}
