use super::*;

#[test]
fn question_only_is_a_single_user_message() {
    let messages = ChatRequest::question_only("Why is the sky blue?").to_messages();

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, ChatRole::User);
    assert_eq!(messages[0].content, "Why is the sky blue?");
}

#[test]
fn context_is_placed_in_system_message() {
    let request = ChatRequest::with_context("Where do birds fly?", "Birds fly south.");
    let messages = request.to_messages();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, ChatRole::System);
    assert!(messages[0].content.starts_with(SYSTEM_PROMPT));
    assert!(
        messages[0]
            .content
            .contains("<context>\nBirds fly south.\n</context>")
    );

    assert_eq!(messages[1].role, ChatRole::User);
    assert_eq!(messages[1].content, "Question: Where do birds fly?");
}

#[test]
fn empty_images_are_not_serialized() {
    let message = ChatMessage::new(ChatRole::Assistant, "hello");
    let json = serde_json::to_value(&message).expect("message serializes");

    assert_eq!(
        json,
        serde_json::json!({ "role": "assistant", "content": "hello" })
    );
}

#[test]
fn images_are_serialized_when_present() {
    let message = ChatMessage {
        images: vec!["aGVsbG8=".to_string()],
        ..ChatMessage::new(ChatRole::User, "what is this?")
    };
    let json = serde_json::to_value(&message).expect("message serializes");

    assert_eq!(json["images"][0], "aGVsbG8=");
}

#[test]
fn response_message_without_images_deserializes() {
    let message: ChatMessage =
        serde_json::from_str(r#"{"role":"assistant","content":"42"}"#).expect("valid message");

    assert_eq!(message.role, ChatRole::Assistant);
    assert!(message.images.is_empty());
}
