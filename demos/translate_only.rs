//! Demonstrate using the translation layer without a server.
//!
//! Usage:
//!   `cargo run --example translate_only`

use chat_proxy::translate::request::{to_gemini_request, to_openai_request};
use chat_proxy::translate::response::{gemini_to_outcome, ChatOutcome};
use chat_proxy::translate::types::{parse_messages, ChatReply, ErrorBody};
use serde_json::json;

fn main() {
    // What the browser sends
    let raw = vec![
        json!({"role": "system", "content": "You are a geography expert. Be concise."}),
        json!({"role": "user", "content": "What is the capital of France?"}),
        json!({"role": "assistant", "content": "The capital of France is Paris."}),
        json!({"role": "user", "content": "And Germany?", "name": "visitor"}),
    ];

    println!("=== Gemini request ===");
    match parse_messages(&raw) {
        Ok(messages) => println!(
            "{}",
            serde_json::to_string_pretty(&to_gemini_request(&messages)).unwrap_or_default()
        ),
        Err(e) => println!("400 {}", e.detail()),
    }

    println!("\n=== OpenAI request ===");
    println!(
        "{}",
        serde_json::to_string_pretty(&to_openai_request(&raw, "gpt-3.5-turbo"))
            .unwrap_or_default()
    );

    // What Gemini might answer
    let answers = [
        (
            200,
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Berlin."}]}}]}"#,
        ),
        (200, r#"{"candidates":[],"promptFeedback":{"blockReason":"SAFETY"}}"#),
        (400, r#"{"error":{"code":400,"message":"API key not valid."}}"#),
    ];

    for (status, body) in answers {
        println!("\n=== Upstream {status} ===");
        let rendered = match gemini_to_outcome(status, body) {
            Ok(ChatOutcome::Rejected { message, status }) => {
                format!("{status} {}", json!(ErrorBody::new(message)))
            }
            Ok(outcome) => {
                let reply = ChatReply::new(outcome.reply_text().unwrap_or_default());
                format!("200 {}", json!(reply))
            }
            Err(e) => format!("500 {e}"),
        };
        println!("{rendered}");
    }
}
