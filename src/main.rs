use aruba_noc::errors::ToolErrorKind;

#[tokio::main]
async fn main() {
    match aruba_noc::mcp::server::run_stdio().await {
        Ok(()) => {}
        Err(err) if err.kind == ToolErrorKind::Config => {
            eprintln!("aruba-noc: {}", err);
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("aruba-noc: {}", err);
            std::process::exit(2);
        }
    }
}
