//! User-Agent tokens and the kinds they belong to.
//!
//! Every token renders to a fixed fragment of a User-Agent header. Fragments
//! carry their own punctuation, so a header is the space-joined sequence of
//! the collapsed tokens.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category a token belongs to.
///
/// Membership is an explicit mapping from each [`Token`]; nothing depends on
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// `Mozilla/5.0`, the root of every identity.
    BrowserIdentifier,
    /// `(X11;`
    WindowSystem,
    /// `(Macintosh;`, `(iPhone;`, `(iPad;`
    DeviceType,
    /// macOS as reported by Safari (`10_15_7`).
    MacOs,
    /// macOS as reported by desktop Firefox (`10.15`).
    MacOsFirefox,
    /// `(Windows NT 10.0;`
    Windows,
    /// `Linux`
    Linux,
    /// `CPU iPhone OS ..`
    IPhoneOs,
    /// `CPU OS ..` (iPad)
    IPadOs,
    /// `(Android NN;`
    Android,
    /// Android handset model.
    DeviceModel,
    /// `Win64;`
    OsArchitecture,
    /// `x64;`, `x86_64;`
    ProcessorArchitecture,
    /// Gecko revision, `rv:NN.0)`.
    Revision,
    /// `Gecko/NN.0`, used by mobile Firefox.
    GeckoMobile,
    /// `Gecko/20100101`, used by desktop Firefox.
    GeckoDesktop,
    /// `AppleWebKit/..`
    AppleWebKit,
    /// `(KHTML, like Gecko)`
    AdditionalInfo,
    /// `Firefox/NN.0`
    Firefox,
    /// `FxiOS/NN.0`
    FirefoxMobile,
    /// `Version/NN.N`, Safari's own version.
    Safari,
    /// Trailing `Safari/<webkit>` token.
    SafariWebKit,
    /// Bare `Mobile` marker of Android Firefox.
    MobileMarker,
    /// `Mobile/<build>` of iOS browsers.
    MobileBuild,
}

impl TokenKind {
    /// Operating system tokens, including their version.
    pub fn is_operating_system(self) -> bool {
        matches!(
            self,
            Self::MacOs
                | Self::MacOsFirefox
                | Self::Windows
                | Self::Linux
                | Self::IPhoneOs
                | Self::IPadOs
                | Self::Android
        )
    }

    /// Rendering engine tokens, including their version.
    pub fn is_rendering_engine(self) -> bool {
        matches!(self, Self::GeckoMobile | Self::GeckoDesktop | Self::AppleWebKit)
    }

    /// Tokens that name the browser and its version, i.e. the identity's client.
    pub fn is_browser(self) -> bool {
        matches!(self, Self::Firefox | Self::FirefoxMobile | Self::Safari)
    }

    /// Client name reported for browser tokens of this kind.
    pub fn client_name(self) -> Option<&'static str> {
        match self {
            Self::Firefox => Some("Firefox"),
            Self::FirefoxMobile => Some("FxiOS"),
            Self::Safari => Some("Safari"),
            _ => None,
        }
    }
}

macro_rules! tokens {
    ($($variant:ident => ($kind:ident, $text:literal)),+ $(,)?) => {
        /// A concrete User-Agent token.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Token {
            $($variant,)+
        }

        impl Token {
            /// Every defined token, in declaration order.
            pub const ALL: &'static [Token] = &[$(Token::$variant,)+];

            /// Fragment this token contributes to the header.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Token::$variant => $text,)+
                }
            }

            /// Kind this token belongs to.
            pub fn kind(self) -> TokenKind {
                match self {
                    $(Token::$variant => TokenKind::$kind,)+
                }
            }
        }
    };
}

tokens! {
    Mozilla5 => (BrowserIdentifier, "Mozilla/5.0"),

    X11 => (WindowSystem, "(X11;"),

    Macintosh => (DeviceType, "(Macintosh;"),
    IPhone => (DeviceType, "(iPhone;"),
    IPad => (DeviceType, "(iPad;"),

    MacOs10_14_6 => (MacOs, "Intel Mac OS X 10_14_6)"),
    MacOs10_15_7 => (MacOs, "Intel Mac OS X 10_15_7)"),
    MacOs11_5 => (MacOs, "Intel Mac OS X 11_5)"),
    MacOs11_6_8 => (MacOs, "Intel Mac OS X 11_6_8)"),
    MacOs11_7_9 => (MacOs, "Intel Mac OS X 11_7_9)"),
    MacOs12_3_1 => (MacOs, "Intel Mac OS X 12_3_1)"),
    MacOs12_5_1 => (MacOs, "Intel Mac OS X 12_5_1)"),
    MacOs12_6_8 => (MacOs, "Intel Mac OS X 12_6_8)"),
    MacOs13_1 => (MacOs, "Intel Mac OS X 13_1)"),
    MacOs13_2_1 => (MacOs, "Intel Mac OS X 13_2_1)"),
    MacOs13_3_1 => (MacOs, "Intel Mac OS X 13_3_1)"),
    MacOs13_5 => (MacOs, "Intel Mac OS X 13_5)"),
    MacOs13_5_1 => (MacOs, "Intel Mac OS X 13_5_1)"),

    MacOsFirefox10_14 => (MacOsFirefox, "Intel Mac OS X 10.14;"),
    MacOsFirefox10_15 => (MacOsFirefox, "Intel Mac OS X 10.15;"),
    MacOsFirefox11_5 => (MacOsFirefox, "Intel Mac OS X 11.5;"),
    MacOsFirefox11_6 => (MacOsFirefox, "Intel Mac OS X 11.6;"),
    MacOsFirefox11_7 => (MacOsFirefox, "Intel Mac OS X 11.7;"),
    MacOsFirefox12_3 => (MacOsFirefox, "Intel Mac OS X 12.3;"),
    MacOsFirefox12_5 => (MacOsFirefox, "Intel Mac OS X 12.5;"),
    MacOsFirefox12_6 => (MacOsFirefox, "Intel Mac OS X 12.6;"),
    MacOsFirefox13_1 => (MacOsFirefox, "Intel Mac OS X 13.1;"),
    MacOsFirefox13_2 => (MacOsFirefox, "Intel Mac OS X 13.2;"),
    MacOsFirefox13_3 => (MacOsFirefox, "Intel Mac OS X 13.3;"),
    MacOsFirefox13_5 => (MacOsFirefox, "Intel Mac OS X 13.5;"),

    WindowsNt10_0 => (Windows, "(Windows NT 10.0;"),

    Linux => (Linux, "Linux"),

    IPhoneOs13_7 => (IPhoneOs, "CPU iPhone OS 13_7 like Mac OS X)"),
    IPhoneOs14_8_1 => (IPhoneOs, "CPU iPhone OS 14_8_1 like Mac OS X)"),
    IPhoneOs15_7_9 => (IPhoneOs, "CPU iPhone OS 15_7_9 like Mac OS X)"),
    IPhoneOs16_6 => (IPhoneOs, "CPU iPhone OS 16_6 like Mac OS X)"),
    IPhoneOs16_6_1 => (IPhoneOs, "CPU iPhone OS 16_6_1 like Mac OS X)"),
    IPhoneOs17_0 => (IPhoneOs, "CPU iPhone OS 17_0 like Mac OS X)"),

    IPadOs13_7 => (IPadOs, "CPU OS 13_7 like Mac OS X)"),
    IPadOs14_8_1 => (IPadOs, "CPU OS 14_8_1 like Mac OS X)"),
    IPadOs15_7_9 => (IPadOs, "CPU OS 15_7_9 like Mac OS X)"),
    IPadOs16_6 => (IPadOs, "CPU OS 16_6 like Mac OS X)"),
    IPadOs16_6_1 => (IPadOs, "CPU OS 16_6_1 like Mac OS X)"),
    IPadOs17_0 => (IPadOs, "CPU OS 17_0 like Mac OS X)"),

    Android11 => (Android, "(Android 11;"),
    Android12 => (Android, "(Android 12;"),
    Android13 => (Android, "(Android 13;"),

    SmG973F => (DeviceModel, "SM-G973F;"),
    SmG973U => (DeviceModel, "SM-G973U;"),
    SmA515F => (DeviceModel, "SM-A515F;"),
    SmA515U => (DeviceModel, "SM-A515U;"),
    SmA536B => (DeviceModel, "SM-A536B;"),
    SmA536U => (DeviceModel, "SM-A536U;"),
    SmG991B => (DeviceModel, "SM-G991B;"),
    SmG991U => (DeviceModel, "SM-G991U;"),
    SmG998B => (DeviceModel, "SM-G998B;"),
    SmG998U => (DeviceModel, "SM-G998U;"),
    SmS901B => (DeviceModel, "SM-S901B;"),
    SmS901U => (DeviceModel, "SM-S901U;"),
    SmS908B => (DeviceModel, "SM-S908B;"),
    SmS908U => (DeviceModel, "SM-S908U;"),
    Pixel6 => (DeviceModel, "Pixel 6;"),
    Pixel6a => (DeviceModel, "Pixel 6a;"),
    Pixel6Pro => (DeviceModel, "Pixel 6 Pro;"),
    Pixel7 => (DeviceModel, "Pixel 7;"),
    Pixel7Pro => (DeviceModel, "Pixel 7 Pro;"),
    MotoGPure => (DeviceModel, "Moto G Pure;"),
    MotoGStylus5G => (DeviceModel, "Moto G Stylus 5G;"),
    MotoGStylus5G2022 => (DeviceModel, "Moto G Stylus 5G (2022);"),
    MotoG5G2022 => (DeviceModel, "Moto G 5G (2022);"),
    MotoGPower2021 => (DeviceModel, "Moto G Power (2021);"),
    MotoGPower2022 => (DeviceModel, "Moto G Power (2022);"),
    RedmiNote8Pro => (DeviceModel, "Redmi Note 8 Pro;"),
    RedmiNote9Pro => (DeviceModel, "Redmi Note 9 Pro;"),
    M2101K6G => (DeviceModel, "M2101K6G;"),
    M2102J20SG => (DeviceModel, "M2102J20SG;"),
    De2118 => (DeviceModel, "DE2118;"),

    Win64 => (OsArchitecture, "Win64;"),

    X64 => (ProcessorArchitecture, "x64;"),
    X86_64 => (ProcessorArchitecture, "x86_64;"),

    Revision99 => (Revision, "rv:99.0)"),
    Revision102 => (Revision, "rv:102.0)"),
    Revision105 => (Revision, "rv:105.0)"),

    GeckoMobile99 => (GeckoMobile, "Gecko/99.0"),
    GeckoMobile102 => (GeckoMobile, "Gecko/102.0"),
    GeckoMobile105 => (GeckoMobile, "Gecko/105.0"),

    Gecko20100101 => (GeckoDesktop, "Gecko/20100101"),

    AppleWebKit605_1_15 => (AppleWebKit, "AppleWebKit/605.1.15"),

    Khtml => (AdditionalInfo, "(KHTML, like Gecko)"),

    Firefox99 => (Firefox, "Firefox/99.0"),
    Firefox102 => (Firefox, "Firefox/102.0"),
    Firefox105 => (Firefox, "Firefox/105.0"),

    FxiOs99 => (FirefoxMobile, "FxiOS/99.0"),
    FxiOs102 => (FirefoxMobile, "FxiOS/102.0"),
    FxiOs105 => (FirefoxMobile, "FxiOS/105.0"),

    Safari15_6_1 => (Safari, "Version/15.6.1"),
    Safari16_5_2 => (Safari, "Version/16.5.2"),
    Safari16_6_1 => (Safari, "Version/16.6.1"),

    SafariWebKit605_1_15 => (SafariWebKit, "Safari/605.1.15"),

    Mobile => (MobileMarker, "Mobile"),

    MobileBuild15E148 => (MobileBuild, "Mobile/15E148"),
}

impl Token {
    /// The root browser identifier every identity starts with.
    pub const ROOT: Token = Token::Mozilla5;

    /// Version number carried by revision, engine and browser tokens.
    ///
    /// `rv:105.0)`, `Gecko/105.0` and `Firefox/105.0` all report `105.0`,
    /// which is what the grammar compares to keep paired tokens aligned.
    pub fn version(self) -> Option<&'static str> {
        let text = self.as_str();
        match self.kind() {
            TokenKind::Revision => text
                .strip_prefix("rv:")
                .and_then(|rest| rest.strip_suffix(')')),
            TokenKind::GeckoMobile
            | TokenKind::AppleWebKit
            | TokenKind::Firefox
            | TokenKind::FirefoxMobile
            | TokenKind::Safari
            | TokenKind::SafariWebKit => text.split_once('/').map(|(_, version)| version),
            _ => None,
        }
    }

    /// Client name when this token identifies the browser.
    pub fn client(self) -> Option<&'static str> {
        self.kind().client_name()
    }

    /// Whether both tokens carry a version and the versions are equal.
    pub fn same_version(self, other: Token) -> bool {
        match (self.version(), other.version()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Tokens of the given kind, in declaration order.
    pub fn of_kind(kind: TokenKind) -> impl Iterator<Item = Token> {
        Token::ALL.iter().copied().filter(move |t| t.kind() == kind)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_only_browser_identifier() {
        let roots: Vec<Token> = Token::of_kind(TokenKind::BrowserIdentifier).collect();
        assert_eq!(roots, vec![Token::ROOT]);
        assert_eq!(Token::ROOT.as_str(), "Mozilla/5.0");
    }

    #[test]
    fn test_versions() {
        assert_eq!(Token::Revision105.version(), Some("105.0"));
        assert_eq!(Token::GeckoMobile99.version(), Some("99.0"));
        assert_eq!(Token::Firefox102.version(), Some("102.0"));
        assert_eq!(Token::FxiOs105.version(), Some("105.0"));
        assert_eq!(Token::Safari16_5_2.version(), Some("16.5.2"));
        assert_eq!(Token::AppleWebKit605_1_15.version(), Some("605.1.15"));
        assert_eq!(Token::SafariWebKit605_1_15.version(), Some("605.1.15"));
        assert_eq!(Token::Gecko20100101.version(), None);
        assert_eq!(Token::Linux.version(), None);
    }

    #[test]
    fn test_same_version_pairs() {
        assert!(Token::Revision99.same_version(Token::GeckoMobile99));
        assert!(Token::Revision99.same_version(Token::Firefox99));
        assert!(!Token::Revision99.same_version(Token::Firefox105));
        assert!(Token::AppleWebKit605_1_15.same_version(Token::SafariWebKit605_1_15));
        assert!(!Token::Linux.same_version(Token::Linux));
    }

    #[test]
    fn test_clients() {
        assert_eq!(Token::Firefox105.client(), Some("Firefox"));
        assert_eq!(Token::FxiOs99.client(), Some("FxiOS"));
        assert_eq!(Token::Safari15_6_1.client(), Some("Safari"));
        assert_eq!(Token::SafariWebKit605_1_15.client(), None);
    }

    #[test]
    fn test_every_token_renders() {
        for token in Token::ALL {
            assert!(!token.as_str().is_empty(), "{:?} renders empty", token);
        }
    }
}
