use std::process;

fn main() {
    if monora::cli::run().is_err() {
        process::exit(1);
    }
}
