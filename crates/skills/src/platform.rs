//! Static registry of supported tools and where each expects its skills.
//!
//! Every platform shares one schema; all differences between tools are data
//! in [`PLATFORMS`].

/// Installation metadata for one external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformInfo {
    /// Stable identifier stored in installation records.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Skills directory relative to the scope base (home or project root).
    /// Empty when the tool has no skills directory.
    pub skills_dir: &'static str,
    /// Executable name used by platform detection.
    pub cli_command: Option<&'static str>,
    /// Paths relative to the home directory whose presence indicates the tool
    /// is installed.
    pub detect_paths: &'static [&'static str],
    /// Alternative spellings accepted from users.
    pub aliases: &'static [&'static str],
}

impl PlatformInfo {
    pub fn supports_skills(&self) -> bool {
        !self.skills_dir.is_empty()
    }

    fn matches(&self, name: &str) -> bool {
        self.id.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

const fn platform(
    id: &'static str,
    name: &'static str,
    skills_dir: &'static str,
    cli_command: Option<&'static str>,
    detect_paths: &'static [&'static str],
    aliases: &'static [&'static str],
) -> PlatformInfo {
    PlatformInfo {
        id,
        name,
        skills_dir,
        cli_command,
        detect_paths,
        aliases,
    }
}

/// Platform used when the user has not configured any.
pub const DEFAULT_PLATFORM: &str = "claude";

#[rustfmt::skip]
pub static PLATFORMS: &[PlatformInfo] = &[
    platform("claude", "Claude Code", ".claude/skills", Some("claude"), &[".claude"], &["claude-code"]),
    platform("cursor", "Cursor", ".cursor/skills", Some("cursor"), &[".cursor"], &[]),
    platform("codex", "Codex CLI", ".codex/skills", Some("codex"), &[".codex"], &["openai-codex"]),
    platform("gemini", "Gemini CLI", ".gemini/skills", Some("gemini"), &[".gemini"], &["gemini-cli"]),
    platform("copilot", "GitHub Copilot", ".copilot/skills", Some("copilot"), &[".copilot"], &["github-copilot"]),
    platform("windsurf", "Windsurf", ".windsurf/skills", Some("windsurf"), &[".windsurf", ".codeium/windsurf"], &[]),
    platform("opencode", "OpenCode", ".opencode/skill", Some("opencode"), &[".opencode", ".config/opencode"], &[]),
    platform("amp", "Amp", ".agents/skills", Some("amp"), &[".config/amp"], &[]),
    platform("kiro", "Kiro", ".kiro/skills", Some("kiro"), &[".kiro"], &[]),
    platform("roo", "Roo Code", ".roo/skills", None, &[".roo"], &["roo-code"]),
    platform("cline", "Cline", ".cline/skills", Some("cline"), &[".cline"], &[]),
    platform("kilo", "Kilo Code", ".kilocode/skills", None, &[".kilocode"], &["kilocode"]),
    platform("goose", "Goose", ".goose/skills", Some("goose"), &[".config/goose"], &[]),
    platform("continue", "Continue", ".continue/skills", Some("cn"), &[".continue"], &[]),
    platform("augment", "Augment", ".augment/skills", Some("auggie"), &[".augment"], &["auggie"]),
    platform("qwen", "Qwen Code", ".qwen/skills", Some("qwen"), &[".qwen"], &["qwen-code"]),
    platform("trae", "Trae", ".trae/skills", Some("trae"), &[".trae"], &[]),
    platform("crush", "Crush", ".crush/skills", Some("crush"), &[".config/crush"], &[]),
    platform("droid", "Factory Droid", ".factory/skills", Some("droid"), &[".factory"], &["factory"]),
    platform("openhands", "OpenHands", ".openhands/skills", Some("openhands"), &[".openhands"], &[]),
    platform("junie", "Junie", ".junie/skills", None, &[".junie"], &[]),
    platform("zencoder", "Zencoder", ".zencoder/skills", None, &[".zencoder"], &[]),
    platform("qoder", "Qoder", ".qoder/skills", Some("qoder"), &[".qoder"], &[]),
    platform("codebuddy", "CodeBuddy", ".codebuddy/skills", Some("codebuddy"), &[".codebuddy"], &[]),
    platform("neovate", "Neovate", ".neovate/skills", Some("neovate"), &[".neovate"], &[]),
    platform("iflow", "iFlow CLI", ".iflow/skills", Some("iflow"), &[".iflow"], &[]),
    platform("kode", "Kode", ".kode/skills", Some("kode"), &[".kode"], &[]),
    platform("mux", "Mux", ".mux/skills", Some("mux"), &[".mux"], &[]),
    platform("commandcode", "Command Code", ".commandcode/skills", Some("cmd"), &[".commandcode"], &[]),
    platform("pochi", "Pochi", ".pochi/skills", Some("pochi"), &[".pochi"], &[]),
    platform("moltis", "Moltis", ".moltis/skills", Some("moltis"), &[".moltis"], &[]),
    platform("openclaw", "OpenClaw", ".openclaw/skills", Some("openclaw"), &[".openclaw"], &[]),
    platform("aider", "Aider", "", Some("aider"), &[".aider.conf.yml"], &[]),
    platform("zed", "Zed", "", Some("zed"), &[".config/zed"], &[]),
];

/// All registered platforms in stable order.
pub fn all() -> &'static [PlatformInfo] {
    PLATFORMS
}

/// Registered platform identifiers in stable order.
pub fn ids() -> impl Iterator<Item = &'static str> {
    PLATFORMS.iter().map(|p| p.id)
}

/// Metadata for `id`, or `None` for an unknown platform.
pub fn info(id: &str) -> Option<&'static PlatformInfo> {
    PLATFORMS.iter().find(|p| p.id == id)
}

/// Resolve a user-supplied name (id or alias, any case) to a canonical id.
pub fn parse_platform(name: &str) -> Option<&'static str> {
    let name = name.trim();
    PLATFORMS.iter().find(|p| p.matches(name)).map(|p| p.id)
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, std::collections::HashSet};

    #[test]
    fn registry_ids_are_unique() {
        let ids: HashSet<_> = ids().collect();
        assert_eq!(ids.len(), PLATFORMS.len());
        assert!(PLATFORMS.len() >= 30);
    }

    #[test]
    fn skills_dirs_do_not_collide() {
        let mut seen = HashSet::new();
        for p in PLATFORMS.iter().filter(|p| p.supports_skills()) {
            assert!(seen.insert(p.skills_dir), "duplicate skills dir {}", p.skills_dir);
        }
    }

    #[test]
    fn info_returns_none_for_unknown() {
        assert!(info("not-a-tool").is_none());
        assert!(info("").is_none());
        assert_eq!(info("cursor").map(|p| p.skills_dir), Some(".cursor/skills"));
    }

    #[rstest]
    #[case("Claude-Code", Some("claude"))]
    #[case(" CURSOR ", Some("cursor"))]
    #[case("factory", Some("droid"))]
    #[case("vim", None)]
    fn parse_accepts_aliases_and_case(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(parse_platform(input), expected);
    }

    #[test]
    fn default_platform_is_registered() {
        assert!(info(DEFAULT_PLATFORM).is_some_and(PlatformInfo::supports_skills));
    }

    #[test]
    fn some_platforms_have_no_skills_dir() {
        assert!(!info("aider").is_some_and(PlatformInfo::supports_skills));
    }
}
