fn main() {
    println!("cargo:rerun-if-changed=csrc/fake_log.c");

    // mosquitto_log_printf is variadic; the stand-in has to be real C so the
    // format string is interpreted exactly as the broker would.
    cc::Build::new()
        .file("csrc/fake_log.c")
        .std("c11")
        .warnings(true)
        .compile("fake_log");
}
