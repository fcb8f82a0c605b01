//! `docbot context`: Show what the assistant would see for a question.

pub async fn run(
    question: &str,
    top_k: Option<usize>,
    report: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let retriever = super::build_retriever(&config)?;
    let top_k = top_k.unwrap_or(retriever.top_k());

    let question = question.to_string();
    let retrieval =
        tokio::task::spawn_blocking(move || retriever.retrieve(&question, top_k)).await?;

    if report {
        println!("{}", serde_json::to_string_pretty(&retrieval)?);
    } else if retrieval.context.is_empty() {
        eprintln!(
            "  No context: {} document(s) in {}",
            retrieval.corpus_size,
            config.retrieval.docs_dir.display()
        );
    } else {
        println!("{}", retrieval.context);
    }

    Ok(())
}
