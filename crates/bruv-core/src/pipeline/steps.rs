//! Individual annotation and filter steps.
//!
//! Each mapper rewrites one [`AnnotatedChange`] in place; each filter
//! returns whether the change is kept. [`super::annotation_pipeline`] wires
//! them up in order and documents which step depends on which.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::Config;
use crate::core::CoreResult;
use crate::store::ReadStateStore;

use super::AnnotatedChange;

/// Marker Gerrit puts at the start of review comments.
static PATCH_SET_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:Patch Set|Uploaded patch set) ([0-9]+)").expect("valid regex")
});

/// `Key: value` trailer line.
static HEADER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:]+):[ \t]*(\S.*)$").expect("valid regex"));

/// Trailer keys that link a change to a bug.
pub const BUG_HEADER_KEYS: [&str; 5] = [
    "Closes-Bug",
    "Partial-Bug",
    "Related-Bug",
    "Related",
    "Closes",
];

/// Drop comments written by bot accounts.
pub fn strip_bot_comments(change: &mut AnnotatedChange, config: &Config) {
    change.change.comments.retain(|comment| {
        comment
            .reviewer
            .username
            .as_deref()
            .map_or(true, |username| !config.is_bot(username))
    });
}

/// Patch set number referenced at the start of a line of a review comment.
///
/// The first marker whose number fits a `u32` wins.
#[must_use]
pub fn parse_patch_set(message: &str) -> Option<u32> {
    PATCH_SET_MARKER
        .captures_iter(message)
        .find_map(|caps| caps.get(1)?.as_str().parse().ok())
}

/// Work out which patch set `self_identity` last reviewed.
///
/// With no review comment by `self_identity`, or one whose patch set cannot
/// be parsed, the change is "never checked": changed since last comment,
/// no last-checked patch set, diff URL pointing at the change itself.
pub fn annotate_last_checked(change: &mut AnnotatedChange, self_identity: &str, host: &str) {
    change.diff_url.clone_from(&change.change.url);
    change.change_since_last_comment = true;
    change.last_checked_patch_set = None;

    let Some(comment) = change
        .change
        .comments
        .iter()
        .rev()
        .find(|comment| comment.reviewer.is(self_identity))
    else {
        return;
    };

    let Some(last_checked) = parse_patch_set(&comment.message) else {
        debug!(
            change = change.change.number,
            "no patch set marker in last own comment, treating as never checked"
        );
        return;
    };

    change.last_checked_patch_set = Some(last_checked);

    let Some(current) = change.change.current_patch_set.as_ref().map(|p| p.number) else {
        return;
    };

    change.change_since_last_comment = current != last_checked;
    if current != last_checked {
        change.diff_url = format!(
            "http://{host}/#/c/{}/{last_checked}..{current}",
            change.change.number
        );
    }
}

/// Look up read state. A change is read only if it was read after its last update.
pub fn annotate_read_state(change: &mut AnnotatedChange, store: &ReadStateStore) -> CoreResult<()> {
    let record = store.get(change.change.number)?;
    change.last_read = record.as_ref().map(|r| r.last_read);
    change.is_read = record.is_some_and(|r| r.covers(change.change.last_updated));
    Ok(())
}

/// Every `Key: value` line of a commit message, in order, duplicates kept.
#[must_use]
pub fn extract_headers(message: &str) -> Vec<(String, String)> {
    message
        .lines()
        .filter_map(|line| HEADER_LINE.captures(line))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

pub fn annotate_headers(change: &mut AnnotatedChange) {
    change.headers = extract_headers(&change.change.commit_message);
}

/// Values of bug-linking trailers.
#[must_use]
pub fn related_bugs(headers: &[(String, String)]) -> BTreeSet<String> {
    headers
        .iter()
        .filter(|(key, _)| BUG_HEADER_KEYS.contains(&key.as_str()))
        .map(|(_, value)| value.clone())
        .collect()
}

pub fn annotate_related_bugs(change: &mut AnnotatedChange) {
    change.related_bugs = related_bugs(&change.headers);
}

/// Whether the trailers declare `Implements: blueprint...`.
#[must_use]
pub fn implements_blueprint(headers: &[(String, String)]) -> bool {
    headers
        .iter()
        .any(|(key, value)| key == "Implements" && value.starts_with("blueprint"))
}

pub fn annotate_blueprint(change: &mut AnnotatedChange) {
    change.is_blueprint = implements_blueprint(&change.headers);
}

pub fn annotate_bug_base_url(change: &mut AnnotatedChange, config: &Config) {
    change.bug_base_url = config.bug_base_url(&change.change.project).to_string();
}

#[must_use]
pub const fn changed_since_last_comment(change: &AnnotatedChange) -> bool {
    change.change_since_last_comment
}

#[must_use]
pub const fn unread(change: &AnnotatedChange) -> bool {
    !change.is_read
}

#[must_use]
pub fn not_mine(change: &AnnotatedChange, self_identity: &str) -> bool {
    !change.change.owner.is(self_identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gerrit::{Account, Change, Comment, PatchSet};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    fn account(username: &str) -> Account {
        Account {
            name: None,
            email: None,
            username: Some(username.to_string()),
        }
    }

    fn comment(author: &str, message: &str) -> Comment {
        Comment {
            timestamp: at(100),
            reviewer: account(author),
            message: message.to_string(),
        }
    }

    fn change(current: u32, comments: Vec<Comment>) -> AnnotatedChange {
        AnnotatedChange::from(Change {
            number: 42,
            id: "I42".to_string(),
            project: "openstack/nova".to_string(),
            branch: "master".to_string(),
            topic: None,
            subject: "Do things".to_string(),
            owner: account("carol"),
            url: "https://review.example.org/42".to_string(),
            status: "NEW".to_string(),
            open: true,
            commit_message: String::new(),
            last_updated: at(1000),
            comments,
            current_patch_set: Some(PatchSet {
                number: current,
                revision: String::new(),
                git_ref: String::new(),
            }),
        })
    }

    fn config() -> Config {
        Config::from_json(r#"{"username": "me"}"#, "test").expect("config")
    }

    #[test]
    fn test_strip_bot_comments_preserves_order() {
        let mut c = change(
            1,
            vec![
                comment("alice", "a"),
                comment("jenkins", "j"),
                comment("bob", "b"),
            ],
        );
        strip_bot_comments(&mut c, &config());
        let authors: Vec<_> = c
            .change
            .comments
            .iter()
            .filter_map(|c| c.reviewer.username.clone())
            .collect();
        assert_eq!(authors, vec!["alice", "bob"]);
    }

    #[test]
    fn test_strip_bot_comments_keeps_anonymous() {
        let mut c = change(1, vec![comment("jenkins", "j")]);
        c.change.comments.push(Comment {
            timestamp: at(1),
            reviewer: Account::default(),
            message: "anonymous".to_string(),
        });
        strip_bot_comments(&mut c, &config());
        assert_eq!(c.change.comments.len(), 1);
        assert_eq!(c.change.comments[0].message, "anonymous");
    }

    #[test]
    fn test_parse_patch_set_variants() {
        assert_eq!(parse_patch_set("Patch Set 3: Code-Review+2"), Some(3));
        assert_eq!(parse_patch_set("Uploaded patch set 12."), Some(12));
        assert_eq!(parse_patch_set("Looks good\nPatch Set 4:\n"), Some(4));
        assert_eq!(parse_patch_set("see Patch Set 4"), None);
        assert_eq!(parse_patch_set("LGTM"), None);
        assert_eq!(parse_patch_set("Patch Set 99999999999: overflow"), None);
    }

    #[test]
    fn test_parse_patch_set_skips_unusable_markers() {
        assert_eq!(parse_patch_set("Patch Set \u{ff13}: x\nPatch Set 4: y"), Some(4));
        assert_eq!(parse_patch_set("Patch Set \u{ff13}: x"), None);
        assert_eq!(
            parse_patch_set("Patch Set 99999999999: x\nUploaded patch set 7."),
            Some(7)
        );
    }

    #[test]
    fn test_last_checked_differs_from_current() {
        let mut c = change(5, vec![comment("me", "Patch Set 3: Code-Review+2")]);
        annotate_last_checked(&mut c, "me", "review.example.org");
        assert_eq!(c.last_checked_patch_set, Some(3));
        assert!(c.change_since_last_comment);
        assert_eq!(c.diff_url, "http://review.example.org/#/c/42/3..5");
    }

    #[test]
    fn test_last_checked_equals_current() {
        let mut c = change(5, vec![comment("me", "Patch Set 5: Code-Review+1")]);
        annotate_last_checked(&mut c, "me", "review.example.org");
        assert_eq!(c.last_checked_patch_set, Some(5));
        assert!(!c.change_since_last_comment);
        assert_eq!(c.diff_url, "https://review.example.org/42");
    }

    #[test]
    fn test_last_checked_without_own_comment() {
        let mut c = change(5, vec![comment("alice", "Patch Set 5: Code-Review+1")]);
        annotate_last_checked(&mut c, "me", "review.example.org");
        assert_eq!(c.last_checked_patch_set, None);
        assert!(c.change_since_last_comment);
        assert_eq!(c.diff_url, "https://review.example.org/42");
    }

    #[test]
    fn test_last_checked_unparsable_falls_back() {
        let mut c = change(5, vec![comment("me", "Nice work")]);
        annotate_last_checked(&mut c, "me", "review.example.org");
        assert_eq!(c.last_checked_patch_set, None);
        assert!(c.change_since_last_comment);
    }

    #[test]
    fn test_last_checked_uses_most_recent_own_comment() {
        let mut c = change(
            5,
            vec![
                comment("me", "Patch Set 2: Code-Review-1"),
                comment("alice", "Patch Set 4"),
                comment("me", "Patch Set 5: Code-Review+2"),
            ],
        );
        annotate_last_checked(&mut c, "me", "review.example.org");
        assert_eq!(c.last_checked_patch_set, Some(5));
        assert!(!c.change_since_last_comment);
    }

    #[test]
    fn test_extract_headers_keeps_order_and_duplicates() {
        let message = "Subject line\n\nBody text.\n\nRelated-Bug: 1\nRelated-Bug: 2\nChange-Id: I00\n";
        assert_eq!(
            extract_headers(message),
            vec![
                ("Related-Bug".to_string(), "1".to_string()),
                ("Related-Bug".to_string(), "2".to_string()),
                ("Change-Id".to_string(), "I00".to_string()),
            ]
        );
        assert_eq!(extract_headers(message), extract_headers(message));
    }

    #[test]
    fn test_extract_headers_skips_empty_values() {
        assert!(extract_headers("Key:\nKey:   \n").is_empty());
    }

    #[test]
    fn test_related_bugs_dedupes_recognized_keys() {
        let headers = extract_headers(
            "Closes-Bug: 123456\nPartial-Bug: 7\nRelated: 123456\nSigned-off-by: me\nCloses: 9\n",
        );
        let bugs: Vec<_> = related_bugs(&headers).into_iter().collect();
        assert_eq!(bugs, vec!["123456", "7", "9"]);
    }

    #[test]
    fn test_blueprint_detection() {
        assert!(implements_blueprint(&extract_headers(
            "Implements: blueprint-foo\n"
        )));
        assert!(!implements_blueprint(&extract_headers(
            "Implements: Blueprint-foo\n"
        )));
        assert!(!implements_blueprint(&extract_headers(
            "Partial-Implements: blueprint foo\n"
        )));
    }

    #[test]
    fn test_bug_base_url_default() {
        let mut c = change(1, Vec::new());
        annotate_bug_base_url(&mut c, &config());
        assert_eq!(c.bug_base_url, "https://launchpad.net/bugs");
    }

    #[test]
    fn test_read_state_annotation() {
        let store = ReadStateStore::open_in_memory().expect("store");
        let mut c = change(1, Vec::new());

        annotate_read_state(&mut c, &store).expect("annotate");
        assert!(!c.is_read);
        assert!(c.last_read.is_none());

        store.mark_read(42).expect("mark");
        annotate_read_state(&mut c, &store).expect("annotate");
        assert!(c.is_read);
        assert!(c.last_read.is_some());
    }

    #[test]
    fn test_not_mine() {
        let c = change(1, Vec::new());
        assert!(not_mine(&c, "me"));
        assert!(!not_mine(&c, "carol"));
    }
}
