fn main() {
    line_extractor::cli::run();
}
