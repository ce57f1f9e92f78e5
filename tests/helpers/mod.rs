#![allow(dead_code)]

pub mod mock_server;
pub mod tls;

use std::sync::Arc;

use fakebro::{Catalog, Roller, Token, TokenFilter};

/// Only ever produces `Mozilla/5.0 (X11; Linux x86_64; rv:105.0) Gecko/20100101 Firefox/105.0`.
pub fn linux_firefox_105() -> TokenFilter {
    TokenFilter::allow([
        Token::Mozilla5,
        Token::X11,
        Token::Linux,
        Token::X86_64,
        Token::Revision105,
        Token::Gecko20100101,
        Token::Firefox105,
    ])
}

pub fn firefox_105_roller() -> Roller {
    Roller::new(Arc::new(Catalog::builtin())).with_filter(linux_firefox_105())
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("fakebro=debug")
        .with_test_writer()
        .try_init();
}
