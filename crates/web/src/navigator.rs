//! `window.location` navigation

use pitstop_core::Navigator;

/// [`Navigator`] over the browser's `window.location`
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserNavigator;

impl BrowserNavigator {
    pub fn new() -> Self {
        Self
    }
}

impl Navigator for BrowserNavigator {
    fn current_location(&self) -> Option<String> {
        let location = web_sys::window()?.location();
        let pathname = location.pathname().ok()?;
        let search = location.search().unwrap_or_default();
        let hash = location.hash().unwrap_or_default();
        Some(format!("{pathname}{search}{hash}"))
    }

    fn navigate(&self, location: &str) {
        let Some(window) = web_sys::window() else {
            tracing::warn!(%location, "No window to navigate");
            return;
        };
        if let Err(e) = window.location().set_href(location) {
            tracing::warn!(%location, "Navigation failed: {:?}", e);
        }
    }
}
