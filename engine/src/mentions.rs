// Comment Mentions - @user extraction from incident comment text

use regex::Regex;
use tracing::error;
use uuid::Uuid;
use vigil_shared::CommentMention;

const MENTION_PATTERN: &str = r"@([A-Za-z0-9_.]+)";

/// Every `@user` occurrence in `text`, in order. Repeated mentions of the
/// same user are kept; the caller decides whether to collapse them.
pub fn extract_mentions(text: &str) -> Vec<String> {
    let regex = match Regex::new(MENTION_PATTERN) {
        Ok(regex) => regex,
        Err(e) => {
            error!(error = %e, "Mention pattern failed to compile");
            return Vec::new();
        }
    };
    regex
        .captures_iter(text)
        .map(|capture| capture[1].to_string())
        .collect()
}

/// One `CommentMention` record per `@user` occurrence in a comment.
pub fn mentions_from_comment(
    tenant_id: &str,
    incident_id: Uuid,
    comment_id: Uuid,
    author: &str,
    text: &str,
) -> Vec<CommentMention> {
    extract_mentions(text)
        .into_iter()
        .map(|user| CommentMention::new(tenant_id, incident_id, comment_id, user, author))
        .collect()
}
