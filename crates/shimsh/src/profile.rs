//! The fabricated system the shell pretends to be running on
//!
//! Everything identity-related that commands print (`uname`, `whoami`, `id`,
//! `hostname`, `/etc/os-release`, the package manager) comes from a
//! [`SystemProfile`]. Nothing here is read from the host.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Default login name.
pub const DEFAULT_USERNAME: &str = "inkling";

/// Default host name.
pub const DEFAULT_HOSTNAME: &str = "fakeos";

/// Default user id.
pub const DEFAULT_UID: u32 = 1337;

/// Operating system family being imitated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OsFlavor {
    #[default]
    Linux,
    Darwin,
    Bsd,
}

impl OsFlavor {
    /// Kernel release reported when none is configured.
    pub fn default_kernel_version(self) -> &'static str {
        match self {
            OsFlavor::Linux => "6.0",
            OsFlavor::Darwin => "23.0.0",
            OsFlavor::Bsd => "14.0",
        }
    }

    /// Login shell binary name.
    pub fn shell(self) -> &'static str {
        match self {
            OsFlavor::Linux => "bash",
            OsFlavor::Darwin => "zsh",
            OsFlavor::Bsd => "csh",
        }
    }

    /// Directory holding user homes.
    pub fn home_base(self) -> &'static str {
        match self {
            OsFlavor::Darwin => "/Users",
            OsFlavor::Linux | OsFlavor::Bsd => "/home",
        }
    }
}

impl fmt::Display for OsFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OsFlavor::Linux => "Linux",
            OsFlavor::Darwin => "Darwin",
            OsFlavor::Bsd => "BSD",
        })
    }
}

impl FromStr for OsFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(OsFlavor::Linux),
            "darwin" | "macos" => Ok(OsFlavor::Darwin),
            "bsd" | "freebsd" => Ok(OsFlavor::Bsd),
            other => Err(format!(
                "unknown OS flavor '{other}' (expected Linux, Darwin or BSD)"
            )),
        }
    }
}

/// Identity of the simulated machine and its user.
#[derive(Debug, Clone)]
pub struct SystemProfile {
    /// OS family
    pub flavor: OsFlavor,
    /// Login name of the unprivileged user
    pub username: String,
    /// Numeric id of the unprivileged user
    pub uid: u32,
    /// Host name shown in the prompt, `hostname` and `uname -n`
    pub hostname: String,
    /// Distribution name (`NAME=` in os-release)
    pub distro_name: String,
    /// Release codename, used by the package manager's mirror lines
    pub distro_codename: String,
    /// Distribution id (`ID=` in os-release)
    pub distro_id: String,
    /// Distribution version
    pub distro_version: String,
    /// Kernel release; `None` means the flavor's default
    pub kernel_version: Option<String>,
    /// Command name of the package manager
    pub package_manager: String,
    /// Mirror URL printed by `update`
    pub package_mirror: String,
}

impl Default for SystemProfile {
    fn default() -> Self {
        Self {
            flavor: OsFlavor::Linux,
            username: DEFAULT_USERNAME.to_string(),
            uid: DEFAULT_UID,
            hostname: DEFAULT_HOSTNAME.to_string(),
            distro_name: "FakeOS".to_string(),
            distro_codename: "marie".to_string(),
            distro_id: "fakeos".to_string(),
            distro_version: "1.0".to_string(),
            kernel_version: None,
            package_manager: "apt".to_string(),
            package_mirror: "http://package.fakeos.org".to_string(),
        }
    }
}

impl SystemProfile {
    /// Create a profile with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the OS flavor
    pub fn flavor(mut self, flavor: OsFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Set the login name
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the user id
    pub fn uid(mut self, uid: u32) -> Self {
        self.uid = uid;
        self
    }

    /// Set the host name
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Set distribution name, codename, id and version at once.
    pub fn distro(
        mut self,
        name: impl Into<String>,
        codename: impl Into<String>,
        id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        self.distro_name = name.into();
        self.distro_codename = codename.into();
        self.distro_id = id.into();
        self.distro_version = version.into();
        self
    }

    /// Set the kernel release
    pub fn kernel_version(mut self, version: impl Into<String>) -> Self {
        self.kernel_version = Some(version.into());
        self
    }

    /// Set the package manager command and its mirror
    pub fn package_manager(mut self, name: impl Into<String>, mirror: impl Into<String>) -> Self {
        self.package_manager = name.into();
        self.package_mirror = mirror.into();
        self
    }

    /// Kernel release in effect.
    pub fn kernel_release(&self) -> &str {
        self.kernel_version
            .as_deref()
            .unwrap_or(self.flavor.default_kernel_version())
    }

    /// Virtual home directory of the user.
    pub fn home_dir(&self) -> String {
        format!("{}/{}", self.flavor.home_base(), self.username)
    }

    /// Name shown for the current identity.
    pub fn identity(&self, privileged: bool) -> &str {
        if privileged { "root" } else { &self.username }
    }

    /// Environment a fresh login would see.
    pub fn login_env(&self) -> HashMap<String, String> {
        let home = self.home_dir();
        let shell = format!("/bin/{}", self.flavor.shell());
        [
            ("USER", self.username.clone()),
            ("LOGNAME", self.username.clone()),
            ("HOME", home),
            ("SHELL", shell),
            (
                "PATH",
                "/usr/local/bin:/usr/bin:/bin:/usr/sbin:/sbin".to_string(),
            ),
            ("HOSTNAME", self.hostname.clone()),
            ("TERM", "xterm-256color".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flavor_parse_is_case_insensitive() {
        assert_eq!("linux".parse::<OsFlavor>().unwrap(), OsFlavor::Linux);
        assert_eq!("DARWIN".parse::<OsFlavor>().unwrap(), OsFlavor::Darwin);
        assert_eq!("Bsd".parse::<OsFlavor>().unwrap(), OsFlavor::Bsd);
        assert!("plan9".parse::<OsFlavor>().is_err());
    }

    #[test]
    fn test_kernel_default_follows_flavor() {
        let profile = SystemProfile::new().flavor(OsFlavor::Darwin);
        assert_eq!(profile.kernel_release(), "23.0.0");
        let profile = profile.kernel_version("19.6.0");
        assert_eq!(profile.kernel_release(), "19.6.0");
    }

    #[test]
    fn test_home_dir_per_flavor() {
        let profile = SystemProfile::new().username("squid");
        assert_eq!(profile.home_dir(), "/home/squid");
        assert_eq!(profile.flavor(OsFlavor::Darwin).home_dir(), "/Users/squid");
    }

    #[test]
    fn test_login_env() {
        let env = SystemProfile::new().flavor(OsFlavor::Bsd).login_env();
        assert_eq!(env["USER"], "inkling");
        assert_eq!(env["HOME"], "/home/inkling");
        assert_eq!(env["SHELL"], "/bin/csh");
    }
}
