mod control_task;
mod file_store;
mod host;
mod pages;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
