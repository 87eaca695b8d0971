use std::process::ExitCode;

use bscpp::core::PreprocessApp;

#[tokio::main]
async fn main() -> ExitCode {
    PreprocessApp::run().await
}
