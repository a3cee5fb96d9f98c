//! `rustedtutor classify`: print the subject label for a question.

use rustedtutor_core::subject::{Query, Route};

use super::{CmdResult, build_tutor, load_config};

pub async fn run(question: &str, offline: bool) -> CmdResult {
    let config = load_config()?;
    let tutor = build_tutor(&config, offline)?;

    let query = Query::new(question)?;
    let label = tutor.classify(&query).await;
    println!("{label}\t{}", Route::from(label));
    Ok(())
}
