#[tokio::main]
async fn main() {
  std::process::exit(pathforge_lib::run().await)
}
