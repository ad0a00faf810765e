fn main() {
    ipeds_pipeline::cli::run();
}
