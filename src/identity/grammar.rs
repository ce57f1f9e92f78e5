//! Adjacency grammar over User-Agent tokens.
//!
//! [`compatible`] decides whether `current` may follow `prev`. The third
//! token, `collapsed`, is the most recently fixed token of the identity being
//! generated; it carries context from further back than the immediate
//! predecessor (which Android version was picked, which revision, which
//! WebKit build). Possibility sets only ever shrink, so a constraint applied
//! while a context token is the collapsed one stays in force afterwards.

use super::token::{Token, TokenKind};

/// Device models that shipped with, or were updated to, Android 11.
const ANDROID_11_DEVICES: &[Token] = &[
    Token::SmG973F,
    Token::SmG973U,
    Token::SmA515F,
    Token::SmA515U,
    Token::SmG991B,
    Token::SmG991U,
    Token::SmG998B,
    Token::SmG998U,
    Token::MotoGPure,
    Token::MotoGStylus5G,
    Token::MotoGPower2021,
    Token::MotoGPower2022,
    Token::RedmiNote8Pro,
    Token::RedmiNote9Pro,
    Token::M2101K6G,
    Token::M2102J20SG,
    Token::De2118,
];

/// Device models running Android 12.
const ANDROID_12_DEVICES: &[Token] = &[
    Token::SmG973F,
    Token::SmG973U,
    Token::SmA515F,
    Token::SmA515U,
    Token::SmA536B,
    Token::SmA536U,
    Token::SmG991B,
    Token::SmG991U,
    Token::SmG998B,
    Token::SmG998U,
    Token::SmS901B,
    Token::SmS901U,
    Token::SmS908B,
    Token::SmS908U,
    Token::Pixel6,
    Token::Pixel6a,
    Token::Pixel6Pro,
    Token::MotoGPure,
    Token::MotoGStylus5G,
    Token::MotoGStylus5G2022,
    Token::MotoG5G2022,
    Token::MotoGPower2022,
    Token::RedmiNote9Pro,
    Token::M2101K6G,
    Token::M2102J20SG,
    Token::De2118,
];

/// Device models running Android 13.
const ANDROID_13_DEVICES: &[Token] = &[
    Token::SmA515F,
    Token::SmA515U,
    Token::SmA536B,
    Token::SmA536U,
    Token::SmG991B,
    Token::SmG991U,
    Token::SmG998B,
    Token::SmG998U,
    Token::SmS901B,
    Token::SmS901U,
    Token::SmS908B,
    Token::SmS908U,
    Token::Pixel6,
    Token::Pixel6a,
    Token::Pixel6Pro,
    Token::Pixel7,
    Token::Pixel7Pro,
    Token::MotoGStylus5G2022,
    Token::MotoG5G2022,
    Token::M2101K6G,
];

/// Device models that can report the given Android version.
pub fn android_devices(android: Token) -> &'static [Token] {
    match android {
        Token::Android11 => ANDROID_11_DEVICES,
        Token::Android12 => ANDROID_12_DEVICES,
        Token::Android13 => ANDROID_13_DEVICES,
        _ => &[],
    }
}

/// Desktop platforms only ever pair with `Gecko/20100101`.
fn is_desktop_context(token: Token) -> bool {
    matches!(token, Token::X11 | Token::WindowsNt10_0 | Token::Macintosh)
}

/// Android Firefox reports the Gecko version equal to its revision.
fn is_mobile_gecko_context(token: Token) -> bool {
    token == Token::Mobile || token.kind() == TokenKind::Android
}

fn is_ios_device(token: Token) -> bool {
    matches!(token, Token::IPhone | Token::IPad)
}

/// `Safari/<webkit>` must repeat the `AppleWebKit/<webkit>` build.
fn safari_webkit_fits(collapsed: Token, current: Token) -> bool {
    current.kind() == TokenKind::SafariWebKit
        && (collapsed.kind() != TokenKind::AppleWebKit || collapsed.same_version(current))
}

/// Whether `current` may follow `prev` given the most recently collapsed token.
pub fn compatible(collapsed: Token, prev: Token, current: Token) -> bool {
    use TokenKind::*;

    let kind = current.kind();
    match prev.kind() {
        BrowserIdentifier => matches!(kind, WindowSystem | DeviceType | Windows | Android),
        WindowSystem => kind == Linux,
        DeviceType => match prev {
            Token::Macintosh => matches!(kind, MacOs | MacOsFirefox),
            Token::IPhone => kind == IPhoneOs,
            Token::IPad => kind == IPadOs,
            _ => false,
        },
        Linux => current == Token::X86_64,
        Windows => current == Token::Win64,
        OsArchitecture => current == Token::X64,
        ProcessorArchitecture | MacOsFirefox | DeviceModel => kind == Revision,
        MacOs | IPhoneOs | IPadOs => kind == AppleWebKit,
        Android => current == Token::Mobile,
        MobileMarker => {
            kind == DeviceModel
                && (collapsed.kind() != Android
                    || android_devices(collapsed).contains(&current))
        }
        Revision => match kind {
            GeckoMobile => !is_desktop_context(collapsed) && prev.same_version(current),
            GeckoDesktop => !is_mobile_gecko_context(collapsed),
            _ => false,
        },
        GeckoDesktop => {
            kind == Firefox
                && (collapsed.kind() != Revision || collapsed.same_version(current))
        }
        GeckoMobile => kind == Firefox && prev.same_version(current),
        AppleWebKit => kind == AdditionalInfo,
        AdditionalInfo => match kind {
            Safari => true,
            FirefoxMobile => collapsed != Token::Macintosh,
            _ => false,
        },
        FirefoxMobile => kind == MobileBuild,
        Safari => {
            if is_ios_device(collapsed) {
                kind == MobileBuild
            } else if collapsed == Token::Macintosh {
                safari_webkit_fits(collapsed, current)
            } else {
                kind == MobileBuild || safari_webkit_fits(collapsed, current)
            }
        }
        MobileBuild => safari_webkit_fits(collapsed, current),
        Firefox | SafariWebKit => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_successors() {
        let next: Vec<Token> = Token::ALL
            .iter()
            .copied()
            .filter(|t| compatible(Token::ROOT, Token::ROOT, *t))
            .collect();
        assert_eq!(
            next,
            vec![
                Token::X11,
                Token::Macintosh,
                Token::IPhone,
                Token::IPad,
                Token::WindowsNt10_0,
                Token::Android11,
                Token::Android12,
                Token::Android13,
            ]
        );
    }

    #[test]
    fn test_android_version_limits_devices() {
        assert!(compatible(Token::Android13, Token::Mobile, Token::Pixel7));
        assert!(!compatible(Token::Android13, Token::Mobile, Token::SmG973F));
        assert!(!compatible(Token::Android11, Token::Mobile, Token::Pixel7));
        assert!(compatible(Token::Android11, Token::Mobile, Token::RedmiNote8Pro));
        // without Android context any model is admissible
        assert!(compatible(Token::Mobile, Token::Mobile, Token::SmG973F));
    }

    #[test]
    fn test_revision_pins_gecko_mobile() {
        assert!(compatible(Token::Mobile, Token::Revision99, Token::GeckoMobile99));
        assert!(!compatible(Token::Mobile, Token::Revision99, Token::GeckoMobile105));
        assert!(!compatible(Token::Mobile, Token::Revision99, Token::Gecko20100101));
        assert!(!compatible(Token::X11, Token::Revision99, Token::GeckoMobile99));
        assert!(compatible(Token::X11, Token::Revision99, Token::Gecko20100101));
    }

    #[test]
    fn test_revision_pins_desktop_firefox() {
        assert!(compatible(Token::Revision102, Token::Gecko20100101, Token::Firefox102));
        assert!(!compatible(Token::Revision102, Token::Gecko20100101, Token::Firefox105));
        assert!(compatible(Token::X11, Token::Gecko20100101, Token::Firefox105));
    }

    #[test]
    fn test_gecko_mobile_pins_firefox() {
        assert!(compatible(Token::Mobile, Token::GeckoMobile105, Token::Firefox105));
        assert!(!compatible(Token::Mobile, Token::GeckoMobile105, Token::Firefox99));
    }

    #[test]
    fn test_safari_branches() {
        // desktop Safari has no mobile build
        assert!(compatible(Token::Macintosh, Token::Safari16_5_2, Token::SafariWebKit605_1_15));
        assert!(!compatible(Token::Macintosh, Token::Safari16_5_2, Token::MobileBuild15E148));
        // iOS Safari requires one
        assert!(compatible(Token::IPhone, Token::Safari16_5_2, Token::MobileBuild15E148));
        assert!(!compatible(Token::IPhone, Token::Safari16_5_2, Token::SafariWebKit605_1_15));
        // FxiOS is not offered on macOS
        assert!(!compatible(Token::Macintosh, Token::Khtml, Token::FxiOs105));
        assert!(compatible(Token::IPad, Token::Khtml, Token::FxiOs105));
    }

    #[test]
    fn test_webkit_version_must_match() {
        assert!(compatible(
            Token::AppleWebKit605_1_15,
            Token::MobileBuild15E148,
            Token::SafariWebKit605_1_15
        ));
    }

    #[test]
    fn test_terminal_tokens() {
        for token in Token::ALL {
            assert!(!compatible(*token, Token::Firefox105, *token));
            assert!(!compatible(*token, Token::SafariWebKit605_1_15, *token));
        }
    }

    #[test]
    fn test_device_lists_are_models() {
        for android in [Token::Android11, Token::Android12, Token::Android13] {
            for device in android_devices(android) {
                assert_eq!(device.kind(), TokenKind::DeviceModel);
            }
        }
    }
}
