//! Overlay kinds and the nesting rules between them.

use std::fmt;

/// Which connection list a connections overlay shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionTab {
    /// Users the profile owner follows.
    #[default]
    Follows,
    /// Users following the profile owner.
    Followers,
}

/// What an overlay displays.
///
/// The payload identifies the displayed entity. It plays no part in the
/// overlay's stack key: the same profile can be open at several depths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    /// A single post.
    Post { post_id: String },
    /// The comment thread under a post.
    Comments { post_id: String },
    /// Users who liked a post.
    Likers { post_id: String },
    /// A user's profile, looked up by email.
    Profile { email: String },
    /// A user's follows or followers.
    Connections { email: String, tab: ConnectionTab },
}

impl OverlayKind {
    pub fn post(post_id: impl Into<String>) -> Self {
        Self::Post {
            post_id: post_id.into(),
        }
    }

    pub fn comments(post_id: impl Into<String>) -> Self {
        Self::Comments {
            post_id: post_id.into(),
        }
    }

    pub fn likers(post_id: impl Into<String>) -> Self {
        Self::Likers {
            post_id: post_id.into(),
        }
    }

    pub fn profile(email: impl Into<String>) -> Self {
        Self::Profile {
            email: email.into(),
        }
    }

    pub fn connections(email: impl Into<String>, tab: ConnectionTab) -> Self {
        Self::Connections {
            email: email.into(),
            tab,
        }
    }

    /// Key segment contributed by this kind.
    pub fn segment(&self) -> &'static str {
        match self {
            Self::Post { .. } => "post",
            Self::Comments { .. } => "comments",
            Self::Likers { .. } => "likers",
            Self::Profile { .. } => "profile",
            Self::Connections {
                tab: ConnectionTab::Follows,
                ..
            } => "follows",
            Self::Connections {
                tab: ConnectionTab::Followers,
                ..
            } => "followers",
        }
    }

    /// Returns `true` if an overlay of this kind may open `child` on top of itself.
    ///
    /// Profile → Connections → Profile recurses without bound, as do
    /// Post → Likers → Profile → Post and Post → Comments → Profile → Post.
    pub fn can_host(&self, child: &OverlayKind) -> bool {
        matches!(
            (self, child),
            (
                Self::Post { .. },
                Self::Comments { .. } | Self::Likers { .. } | Self::Profile { .. }
            ) | (Self::Likers { .. } | Self::Comments { .. }, Self::Profile { .. })
                | (Self::Profile { .. }, Self::Connections { .. } | Self::Post { .. })
                | (Self::Connections { .. }, Self::Profile { .. })
        )
    }
}

impl fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post { post_id } => write!(f, "post {post_id}"),
            Self::Comments { post_id } => write!(f, "comments on {post_id}"),
            Self::Likers { post_id } => write!(f, "likers of {post_id}"),
            Self::Profile { email } => write!(f, "profile {email}"),
            Self::Connections { email, tab } => write!(f, "{tab:?} of {email}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting_rules() {
        let post = OverlayKind::post("p1");
        let likers = OverlayKind::likers("p1");
        let profile = OverlayKind::profile("a@example.com");
        let followers = OverlayKind::connections("a@example.com", ConnectionTab::Followers);

        assert!(post.can_host(&likers));
        assert!(likers.can_host(&profile));
        assert!(profile.can_host(&followers));
        assert!(followers.can_host(&profile));
        assert!(profile.can_host(&post));

        assert!(!likers.can_host(&likers));
        assert!(!followers.can_host(&followers));
        assert!(!profile.can_host(&likers));
    }

    #[test]
    fn comments_nest_under_posts_only() {
        let post = OverlayKind::post("p1");
        let comments = OverlayKind::comments("p1");
        let profile = OverlayKind::profile("a@example.com");

        assert!(post.can_host(&comments));
        assert!(comments.can_host(&profile));
        assert!(!profile.can_host(&comments));
        assert!(!comments.can_host(&comments));
        assert!(!comments.can_host(&post));
        assert_eq!(comments.segment(), "comments");
    }

    #[test]
    fn segments_follow_tab() {
        assert_eq!(
            OverlayKind::connections("x", ConnectionTab::Follows).segment(),
            "follows"
        );
        assert_eq!(
            OverlayKind::connections("x", ConnectionTab::Followers).segment(),
            "followers"
        );
    }
}
