use tracing_subscriber::EnvFilter;

const QUIET_DIRECTIVES: [&str; 2] = ["reqwest=warn", "hyper=warn"];

pub fn setup_logger() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(QUIET_DIRECTIVES[0].parse().expect("static directive"))
        .add_directive(QUIET_DIRECTIVES[1].parse().expect("static directive"));

    tracing_subscriber::fmt()
        // .with_file(true)
        // .with_line_number(true)
        .with_target(true)
        .with_level(true)
        .with_ansi(true)
        .compact()
        .with_env_filter(filter)
        .init();
}
