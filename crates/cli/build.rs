use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("cargo sets OUT_DIR"));
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).expect("create completions dir");

    let mut cmd = clap::Command::new("shelfmark")
        .about("Preview the article Shelfmark would save for a page")
        .arg(clap::arg!(<INPUT> "URL to fetch, local HTML file, or '-' for stdin"))
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format")
                .value_name("FORMAT")
                .default_value("text")
                .value_parser(["text", "json"]),
        )
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--url <URL> "Page URL for file or stdin input"))
        .arg(clap::arg!(--timeout <SECS> "Primary fetch timeout in seconds").default_value("30"))
        .arg(clap::arg!(--"fallback-timeout" <SECS> "Fallback fetch timeout in seconds").default_value("10"))
        .arg(clap::arg!(--"user-agent" <UA> "Custom User-Agent for HTTP requests").value_name("UA"))
        .arg(clap::arg!(--"fallback-only" "Skip the readability pass and only scrape"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    for shell in [
        clap_complete::Shell::Bash,
        clap_complete::Shell::Zsh,
        clap_complete::Shell::Fish,
        clap_complete::Shell::PowerShell,
    ] {
        clap_complete::generate_to(shell, &mut cmd, "shelfmark", &completions_dir).expect("write completions");
    }
}
