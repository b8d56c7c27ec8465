use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    swagger_casegen::run().await
}
