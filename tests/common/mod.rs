#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use property_scout::scrapers::BrowserSession;

/// In-memory browser replaying a fixed list of result pages
pub struct ScriptedSession {
    pages: Vec<String>,
    current: usize,
    opened: Option<String>,
    /// Reading this page index fails with a session fault
    pub fail_on_page: Option<usize>,
    pub releases: Arc<AtomicUsize>,
}

impl ScriptedSession {
    pub fn new(pages: Vec<String>) -> Self {
        Self {
            pages,
            current: 0,
            opened: None,
            fail_on_page: None,
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.releases)
    }
}

impl BrowserSession for ScriptedSession {
    fn open(&mut self, url: &str) -> Result<()> {
        self.opened = Some(url.to_string());
        self.current = 0;
        Ok(())
    }

    fn wait_for(&mut self, _selector: &str, _timeout: Duration) -> Result<bool> {
        if self.opened.is_none() {
            bail!("no page opened");
        }
        Ok(self
            .pages
            .get(self.current)
            .is_some_and(|html| html.contains("rp-property-cd")))
    }

    fn page_html(&mut self) -> Result<String> {
        if self.fail_on_page == Some(self.current) {
            bail!("target closed");
        }
        Ok(self.pages[self.current].clone())
    }

    fn prepare_click(&mut self, _selector: &str, _timeout: Duration) -> Result<bool> {
        Ok(self.current + 1 < self.pages.len())
    }

    fn click(&mut self, _selector: &str) -> Result<()> {
        self.current += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// One listing card as rendered on a result page
pub fn card(id: &str, price: &str, area: &str) -> String {
    format!(
        r#"<li data-cy="rp-property-cd"><a href="https://www.zapimoveis.com.br/imovel/venda-apartamento-2-quartos-pinheiros-sao-paulo-sp-id-{id}/">
             <div data-cy="rp-cardProperty-price-txt"><p>{price}</p><p>Cond. R$ 900 • IPTU R$ 150</p></div>
             <ul>
               <li data-cy="rp-cardProperty-propertyArea-txt"><h3>{area}</h3></li>
               <li data-cy="rp-cardProperty-bedroomQuantity-txt"><h3>2</h3></li>
               <li data-cy="rp-cardProperty-bathroomQuantity-txt"><h3>1-2</h3></li>
               <li data-cy="rp-cardProperty-parkingSpacesQuantity-txt"><h3>1</h3></li>
             </ul>
             <div data-cy="rp-cardProperty-location-txt"><p>Rua dos Pinheiros</p><p>Pinheiros, São Paulo</p></div>
           </a></li>"#
    )
}

/// A result page wrapping the given cards
pub fn page(cards: &[String]) -> String {
    format!(
        "<html><body><ul class=\"results\">{}</ul><button data-testid=\"next-page\">Próxima</button></body></html>",
        cards.join("\n")
    )
}

/// A page of `count` valid cards with ids starting at `first_id`
pub fn numbered_page(first_id: usize, count: usize) -> String {
    let cards: Vec<String> = (first_id..first_id + count)
        .map(|id| card(&id.to_string(), "R$ 500.000", "70 m²"))
        .collect();
    page(&cards)
}
