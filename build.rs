fn main() {
    println!("cargo:rerun-if-changed=partitions.csv");

    // Host builds (tests, fuzzing) have no ESP-IDF environment to export.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
