use std::collections::{HashMap, HashSet};

use crate::user;
use crate::user::Nickname;

/// Resolves `@nickname` tokens in a message body against the room's current
/// member set. Tokens that do not match a member's nickname exactly are
/// dropped; repeated mentions of one user collapse into a single entry.
pub fn resolve(body: &str, members: &HashMap<Nickname, user::Id>) -> HashSet<user::Id> {
    let mut mentioned = HashSet::new();

    let mut chars = body.char_indices().peekable();
    let mut prev: Option<char> = None;

    while let Some((i, c)) = chars.next() {
        if c == '@' && prev.is_none_or(|p| !is_token_char(p)) {
            let start = i + c.len_utf8();
            let mut end = start;

            while let Some(&(j, t)) = chars.peek() {
                if !is_token_char(t) {
                    break;
                }
                end = j + t.len_utf8();
                chars.next();
            }

            // trailing dots read as sentence punctuation, not as the name
            let token = body[start..end].trim_end_matches('.');
            if !token.is_empty() {
                if let Some(id) = members.get(&Nickname::new(token)) {
                    mentioned.insert(*id);
                }
            }
        }

        prev = Some(c);
    }

    mentioned
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn members(nicknames: &[&str]) -> HashMap<Nickname, user::Id> {
        nicknames
            .iter()
            .map(|n| (Nickname::new(*n), user::Id::from(Uuid::new_v4())))
            .collect()
    }

    #[test]
    fn resolves_member_mentions_only() {
        let members = members(&["alice", "bob"]);

        let mentioned = resolve("hey @alice @bob @intruder", &members);

        assert_eq!(mentioned.len(), 2);
        assert!(mentioned.contains(&members[&Nickname::new("alice")]));
        assert!(mentioned.contains(&members[&Nickname::new("bob")]));
    }

    #[test]
    fn duplicates_collapse() {
        let members = members(&["alice"]);

        let mentioned = resolve("@alice @alice @alice", &members);

        assert_eq!(mentioned.len(), 1);
    }

    #[test]
    fn requires_exact_nickname() {
        let members = members(&["alice"]);

        assert!(resolve("@alic", &members).is_empty());
        assert!(resolve("@alices", &members).is_empty());
        assert!(resolve("@Alice", &members).is_empty());
    }

    #[test]
    fn ignores_bare_at_and_emails() {
        let members = members(&["alice", "example.com"]);

        assert!(resolve("reach me @ the office", &members).is_empty());
        assert!(resolve("mail alice@example.com instead", &members).is_empty());
    }

    #[test]
    fn sentence_punctuation_does_not_break_the_token() {
        let members = members(&["alice", "bob"]);

        let mentioned = resolve("thanks @alice. ping @bob, tomorrow", &members);

        assert_eq!(mentioned.len(), 2);
    }

    #[test]
    fn dotted_nicknames_still_resolve() {
        let members = members(&["a.lice"]);

        let mentioned = resolve("hi @a.lice", &members);

        assert_eq!(mentioned.len(), 1);
    }

    #[test]
    fn empty_member_set_never_resolves() {
        let members = HashMap::new();

        assert!(resolve("@alice @bob", &members).is_empty());
    }
}
