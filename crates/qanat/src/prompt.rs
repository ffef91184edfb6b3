//! Prompt construction for the page-design assistant.

use qanat_protocol::{ChatMessage, Role};

/// System prompt sent ahead of every conversation.
const SYSTEM_PROMPT: &str = "\
You are a professional senior web UI designer. From the user's written \
description, generate one complete static HTML page that satisfies all of \
the following rules:

1. Fixed-size layout, never responsive: default page width 375px (mobile), \
or 1440px when the user asks for a desktop design. The page may scroll \
vertically but must not resize with the window. All sizes, spacing, and \
font sizes use px units only; %, rem, em, vw, and vh are forbidden.
2. No JavaScript: no <script> tags, no inline event handlers, no JS-driven \
components. Visual effects use pure CSS only (:hover, :focus, :checked, \
details).
3. No media or container queries.
4. Semantic HTML structure (<header>, <main>, <section>, <article>, \
<footer>) with clear module boundaries and brief comments.
5. All styles inside a single <style> tag in <head>; no external CSS or \
font files. CSS variables may define colors and shared parameters.
6. White background by default; primary color #007bff unless the user \
provides one. Corner radii, shadows, and line widths in px.
7. Every image needs alt text and every form control a <label>.
8. Output one complete HTML file (<!doctype html>, <head> with <meta>, \
<title>, <style>, then <body>), opened by a comment stating the design \
width, primary color, and style. Wrap the HTML in a markdown code fence.
9. Prefer inline SVG for icons; fall back to images, then plain shapes.
10. Do not use pseudo-elements or position properties; simulate with \
regular elements instead.

Now produce the HTML the user asks for.";

/// Build the upstream message list: the system prompt followed by the
/// client-supplied history. Only user and assistant turns are forwarded;
/// anything else the client sent is dropped.
pub fn build_messages(history: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::new(Role::System, SYSTEM_PROMPT));
    messages.extend(
        history
            .iter()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant))
            .cloned(),
    );
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_comes_first() {
        let messages = build_messages(&[ChatMessage::new(Role::User, "a landing page")]);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "a landing page");
    }

    #[test]
    fn non_conversation_roles_are_dropped() {
        let history = vec![
            ChatMessage::new(Role::System, "ignore me"),
            ChatMessage::new(Role::Other, "tool output"),
            ChatMessage::new(Role::User, "hi"),
            ChatMessage::new(Role::Assistant, "hello"),
        ];
        let messages = build_messages(&history);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].role, Role::Assistant);
    }
}
