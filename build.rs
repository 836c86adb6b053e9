fn main() {
    // Commit hash is optional: builds outside a git checkout report "unknown".
    if let Err(err) = built::write_built_file() {
        println!("cargo:warning=failed to acquire build-time information: {err}");
    }
}
