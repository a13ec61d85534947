use crate::config::{PortalConfig, WebdriverConfig};
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::time::Duration;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;

/// A browser session on the distributor portal.
///
/// The portal is an Oracle APEX app: login is a plain form, but every
/// successful submit triggers a 2FA challenge that only the operator can
/// answer, so `login` blocks on stdin until the operator confirms it in the
/// browser window.
pub struct PortalSession {
    driver: WebDriver,
    portal: PortalConfig,
}

impl PortalSession {
    /// Open a browser against the configured WebDriver server.
    pub async fn connect(webdriver: &WebdriverConfig, portal: PortalConfig) -> Result<Self> {
        let mut caps = DesiredCapabilities::chrome();
        if webdriver.headless {
            caps.add_arg("--headless=new")?;
        }
        caps.add_arg("--window-size=1920,1080")?;
        caps.add_arg("--disable-blink-features=AutomationControlled")?;
        let driver = WebDriver::new(&webdriver.server_url, caps)
            .await
            .with_context(|| {
                format!(
                    "could not reach WebDriver server at {}",
                    webdriver.server_url
                )
            })?;
        Ok(Self { driver, portal })
    }

    /// Fill the login form, submit, and wait for the operator to clear 2FA.
    pub async fn login(&self, username: &str, cnpj: &str) -> Result<()> {
        tracing::info!(url = %self.portal.base_url, "opening portal login page");
        self.driver
            .goto(&self.portal.base_url)
            .await
            .context("portal login page did not load")?;

        let timeout = Duration::from_millis(self.portal.login_wait_ms);
        let poll = Duration::from_millis(500);
        let username_input = self
            .driver
            .query(By::Id(self.portal.username_field.as_str()))
            .wait(timeout, poll)
            .first()
            .await
            .context("username field not found on login page")?;
        let cnpj_input = self
            .driver
            .query(By::Id(self.portal.cnpj_field.as_str()))
            .wait(timeout, poll)
            .first()
            .await
            .context("CNPJ field not found on login page")?;

        username_input.clear().await?;
        username_input.send_keys(username).await?;
        cnpj_input.clear().await?;
        cnpj_input.send_keys(cnpj).await?;

        self.driver
            .find(By::Id(self.portal.login_button.as_str()))
            .await
            .context("login button not found")?
            .click()
            .await
            .context("login submit failed")?;

        wait_for_operator()?;
        tracing::info!("login confirmed, session active");
        Ok(())
    }

    /// Navigate to `url`, going through the portal home once if the direct
    /// navigation fails. APEX drops the session on a bad deep link; loading
    /// home re-establishes it.
    pub async fn goto_recovering(&self, url: &str) -> Result<()> {
        if let Err(e) = self.driver.goto(url).await {
            tracing::warn!(url, error = %e, "navigation failed, recovering via portal home");
            self.driver
                .goto(&self.portal.base_url)
                .await
                .context("recovery navigation to portal home failed")?;
            tokio::time::sleep(Duration::from_millis(self.portal.scroll_poll_ms)).await;
            self.driver
                .goto(url)
                .await
                .with_context(|| format!("navigation to {url} failed after recovery"))?;
        }
        Ok(())
    }

    pub async fn page_source(&self) -> Result<String> {
        Ok(self.driver.source().await?)
    }

    pub async fn scroll_to_bottom(&self) -> Result<()> {
        self.driver
            .execute("window.scrollTo(0, document.body.scrollHeight);", Vec::new())
            .await?;
        Ok(())
    }

    /// Current document height, used to detect when the infinite scroll has
    /// stopped loading more cards.
    pub async fn scroll_height(&self) -> Result<u64> {
        let ret = self
            .driver
            .execute("return document.body.scrollHeight;", Vec::new())
            .await?;
        let height = ret
            .json()
            .as_u64()
            .or_else(|| ret.json().as_f64().map(|h| h as u64))
            .unwrap_or(0);
        Ok(height)
    }

    /// Close the browser.
    pub async fn quit(self) -> Result<()> {
        self.driver.quit().await?;
        Ok(())
    }
}

fn wait_for_operator() -> Result<()> {
    println!();
    println!("  Complete the 2FA challenge in the browser window.");
    print!("  Press Enter here once the portal has accepted it > ");
    io::stdout().flush().context("failed to flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read confirmation")?;
    Ok(())
}
