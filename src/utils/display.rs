use crate::core::{ChatMessage, ConversationRecord, Role};
use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.chars().count()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_message(message: &ChatMessage) {
    let tag = match message.role {
        Role::System => "system".magenta(),
        Role::User => "user".yellow(),
        Role::Assistant => "assistant".green(),
    };
    println!("[{}] {}", tag.bold(), message.content);
}

pub fn print_record(user: &str, record: &ConversationRecord) {
    print_header(&format!("Memory of {}", user));
    print_info(&format!(
        "Persona: {} | identity announced: {} | {} messages",
        record.display_name,
        record.name_introduced,
        record.history.len()
    ));
    for message in &record.history {
        print_message(message);
    }
}
