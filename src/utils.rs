use poise::serenity_prelude as serenity;
use serenity::{GuildId, PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId, UserId};
use std::env;

/// Discord's hard limit for a single message.
pub const MESSAGE_LIMIT: usize = 2000;

fn env_id_list(key: &str) -> Vec<u64> {
    env::var(key)
        .unwrap_or_default()
        .split_whitespace()
        .filter_map(|token| token.trim().parse().ok())
        .collect()
}

/// Check if a guild is blocked from using the bot
pub fn is_blacklisted_guild(guild_id: GuildId) -> bool {
    env_id_list("BLACKLISTED_GUILDS").contains(&guild_id.get())
}

/// Check if a user is blocked from using the bot
pub fn is_blacklisted_user(user_id: UserId) -> bool {
    env_id_list("BLACKLISTED_USERS").contains(&user_id.get())
}

/// Get the support server invite shown on error replies
pub fn support_server_url() -> String {
    env::var("SUPPORT_SERVER_URL").unwrap_or_else(|_| "https://discord.gg/clantrack".to_string())
}

/// Split `content` into chunks that fit in a single Discord message.
///
/// Splits on line boundaries; a single line longer than `limit` is
/// hard-split at the limit.
pub fn split_message(content: &str, limit: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in content.split('\n') {
        // A line that can never fit gets hard-split on char boundaries
        if line.len() > limit {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let mut piece = String::new();
            for ch in line.chars() {
                if piece.len() + ch.len_utf8() > limit {
                    chunks.push(std::mem::take(&mut piece));
                }
                piece.push(ch);
            }
            current = piece;
            continue;
        }

        let needed = if current.is_empty() {
            line.len()
        } else {
            current.len() + 1 + line.len()
        };
        if needed > limit {
            chunks.push(std::mem::take(&mut current));
            current.push_str(line);
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Humanize a millisecond count into its largest unit ("45s", "2m", "3h", "1d")
pub fn humanize_millis(millis: u64) -> String {
    const SECOND: u64 = 1000;
    const MINUTE: u64 = 60 * SECOND;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    if millis >= DAY {
        format!("{}d", round_div(millis, DAY))
    } else if millis >= HOUR {
        format!("{}h", round_div(millis, HOUR))
    } else if millis >= MINUTE {
        format!("{}m", round_div(millis, MINUTE))
    } else if millis >= SECOND {
        format!("{}s", round_div(millis, SECOND))
    } else {
        format!("{}ms", millis)
    }
}

fn round_div(value: u64, unit: u64) -> u64 {
    (value + unit / 2) / unit
}

/// Human-readable name for a permission constant ("UseExternalEmojis" -> "Use External Emojis").
/// View Channel is reported as "Read Messages", the name users actually know it by.
pub fn permission_display_name(name: &str) -> String {
    if name == "ViewChannel" {
        return "Read Messages".to_string();
    }

    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() && i > 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

/// Permissions of the @everyone role in a channel: role base permissions with
/// the channel's @everyone overwrite applied.
pub fn everyone_permissions_in(
    base: Permissions,
    overwrites: &[PermissionOverwrite],
    everyone_role: RoleId,
) -> Permissions {
    let mut permissions = base;
    for overwrite in overwrites {
        if overwrite.kind == PermissionOverwriteType::Role(everyone_role) {
            permissions &= !overwrite.deny;
            permissions |= overwrite.allow;
        }
    }
    permissions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_message_short_content() {
        let chunks = split_message("hello\nworld", MESSAGE_LIMIT);
        assert_eq!(chunks, vec!["hello\nworld"]);
    }

    #[test]
    fn test_split_message_on_line_boundaries() {
        let content = format!("{}\n{}\n{}", "a".repeat(6), "b".repeat(6), "c".repeat(6));
        let chunks = split_message(&content, 13);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], format!("{}\n{}", "a".repeat(6), "b".repeat(6)));
        assert_eq!(chunks[1], "c".repeat(6));
    }

    #[test]
    fn test_split_message_hard_splits_long_line() {
        let content = "x".repeat(25);
        let chunks = split_message(&content, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= 10));
        assert_eq!(chunks.concat(), content);
    }

    #[test]
    fn test_humanize_millis_units() {
        assert_eq!(humanize_millis(450), "450ms");
        assert_eq!(humanize_millis(45_000), "45s");
        assert_eq!(humanize_millis(120_000), "2m");
        assert_eq!(humanize_millis(3 * 60 * 60 * 1000), "3h");
        assert_eq!(humanize_millis(2 * 24 * 60 * 60 * 1000), "2d");
    }

    #[test]
    fn test_humanize_millis_rounds() {
        // 94 seconds rounds to 2 minutes, 85 seconds rounds down to 1
        assert_eq!(humanize_millis(94_000), "2m");
        assert_eq!(humanize_millis(85_000), "1m");
    }

    #[test]
    fn test_permission_display_name() {
        assert_eq!(permission_display_name("ViewChannel"), "Read Messages");
        assert_eq!(
            permission_display_name("UseExternalEmojis"),
            "Use External Emojis"
        );
        assert_eq!(permission_display_name("SendMessages"), "Send Messages");
        assert_eq!(permission_display_name("ManageWebhooks"), "Manage Webhooks");
    }

    #[test]
    fn test_everyone_permissions_apply_overwrite() {
        let everyone = RoleId::new(1);
        let base = Permissions::VIEW_CHANNEL | Permissions::USE_EXTERNAL_EMOJIS;
        let overwrites = vec![PermissionOverwrite {
            allow: Permissions::SEND_MESSAGES,
            deny: Permissions::USE_EXTERNAL_EMOJIS,
            kind: PermissionOverwriteType::Role(everyone),
        }];

        let result = everyone_permissions_in(base, &overwrites, everyone);
        assert!(result.contains(Permissions::VIEW_CHANNEL));
        assert!(result.contains(Permissions::SEND_MESSAGES));
        assert!(!result.contains(Permissions::USE_EXTERNAL_EMOJIS));
    }

    #[test]
    fn test_everyone_permissions_ignore_other_roles() {
        let everyone = RoleId::new(1);
        let overwrites = vec![PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::VIEW_CHANNEL,
            kind: PermissionOverwriteType::Role(RoleId::new(2)),
        }];

        let result = everyone_permissions_in(Permissions::VIEW_CHANNEL, &overwrites, everyone);
        assert!(result.contains(Permissions::VIEW_CHANNEL));
    }
}
