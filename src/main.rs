#[tokio::main]
async fn main() {
    lesson_scheduler::run().await;
}
