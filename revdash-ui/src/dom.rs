//! DOM page host
//!
//! Resolves the dashboard surfaces from the server-rendered markup:
//!
//! | surface | selector |
//! |---|---|
//! | status line | `[data-dashboard-status]` |
//! | refresh button | `#refresh-dashboard` |
//! | contracts table | `#recent-contracts tbody` |
//! | metric card | `[data-metric="<slot>"]` with `.metric-value` / `.metric-detail-value` |
//! | navigation | `a.side-nav__link` inside `[data-dashboard-nav]` |
//! | logout | `#logout-form` + `#logout-button` |
//! | registration message | `#register-message` |
//!
//! Frame attributes (`data-dashboard-endpoint`, `data-refresh-policy`,
//! `data-auto-refresh-secs`) override the configuration defaults.

use std::rc::Rc;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, HtmlButtonElement, HtmlElement, HtmlFormElement, HtmlScriptElement, Window,
};

use revdash::{
    Config, ContractStatus, LoadingIndicator, MessageTarget, MetricId, MetricSlots, NavLink,
    Navigator, PageHost, ScriptHost, ScriptTag, StatusIndicator, TableBody, TableRow, TextSlot,
    Toggle,
};

const FRAME_SELECTOR: &str =
    "[data-dashboard-endpoint], [data-refresh-policy], [data-auto-refresh-secs]";
const LOADING_CLASS: &str = "is-loading";
const ENHANCER_MARKER: &str = "data-htmx-loaded";

/// `querySelector` that treats selector errors as absence
fn query(root: &Document, selector: &str) -> Option<Element> {
    root.query_selector(selector).ok().flatten()
}

fn query_in(root: &Element, selector: &str) -> Option<Element> {
    root.query_selector(selector).ok().flatten()
}

/// The current document, seen as a dashboard page
pub struct DomPage {
    window: Window,
    document: Document,
}

impl DomPage {
    pub fn new() -> Option<Self> {
        let window = web_sys::window()?;
        let document = window.document()?;
        Some(Self { window, document })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Whether the page carries any dashboard markup worth refreshing
    pub fn is_dashboard(&self) -> bool {
        query(&self.document, "[data-dashboard-status], #recent-contracts, [data-metric]").is_some()
    }

    /// Apply frame data attributes on top of `config`
    pub fn apply_frame_config(&self, config: &mut Config) {
        let Some(frame) = query(&self.document, FRAME_SELECTOR) else {
            return;
        };

        config
            .dashboard
            .override_endpoint(frame.get_attribute("data-dashboard-endpoint").as_deref());

        if let Some(policy) = frame.get_attribute("data-refresh-policy") {
            match policy.parse() {
                Ok(policy) => config.dashboard.refresh_policy = policy,
                Err(e) => tracing::warn!("Ignoring data-refresh-policy: {}", e),
            }
        }

        if let Some(secs) = frame.get_attribute("data-auto-refresh-secs") {
            match secs.trim().parse() {
                Ok(secs) => config.dashboard.auto_refresh_secs = secs,
                Err(_) => tracing::warn!(value = %secs, "Ignoring data-auto-refresh-secs"),
            }
        }
    }

    pub fn refresh_button(&self) -> Option<HtmlButtonElement> {
        query(&self.document, "#refresh-dashboard")?.dyn_into().ok()
    }

    /// Anchor links of the side navigation, in document order
    pub fn nav_anchors(&self) -> Vec<Element> {
        let Some(nav) = query(&self.document, "[data-dashboard-nav]") else {
            return Vec::new();
        };
        let Ok(list) = nav.query_selector_all(".side-nav__link") else {
            return Vec::new();
        };

        (0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .filter(|el| el.tag_name().eq_ignore_ascii_case("a"))
            .collect()
    }

    /// The sign-out form, when both it and its button are present
    pub fn logout_form(&self) -> Option<HtmlFormElement> {
        query(&self.document, "#logout-button")?;
        query(&self.document, "#logout-form")?.dyn_into().ok()
    }

    fn logout_button(&self) -> Option<HtmlButtonElement> {
        self.logout_form()?;
        query(&self.document, "#logout-button")?.dyn_into().ok()
    }
}

struct ElementText(Element);

impl TextSlot for ElementText {
    fn set_text(&self, text: &str) {
        self.0.set_text_content(Some(text));
    }
}

struct StatusLine(Element);

impl StatusIndicator for StatusLine {
    fn set_status(&self, message: &str, is_error: bool) {
        self.0.set_text_content(Some(message));
        let result = if is_error {
            self.0.set_attribute("data-error", "true")
        } else {
            self.0.remove_attribute("data-error")
        };
        if let Err(e) = result {
            tracing::warn!("Failed to flag status line: {:?}", e);
        }
    }
}

struct Button(HtmlButtonElement);

impl Toggle for Button {
    fn set_disabled(&self, disabled: bool) {
        self.0.set_disabled(disabled);
    }
}

struct BodyLoading(HtmlElement);

impl LoadingIndicator for BodyLoading {
    fn is_loading(&self) -> bool {
        self.0.class_list().contains(LOADING_CLASS)
    }

    fn clear(&self) {
        if let Err(e) = self.0.class_list().remove_1(LOADING_CLASS) {
            tracing::warn!("Failed to clear loading state: {:?}", e);
        }
    }
}

struct ContractsBody {
    document: Document,
    body: Element,
}

impl ContractsBody {
    fn cell(&self, label: Option<&str>, text: &str) -> Result<Element, JsValue> {
        let cell = self.document.create_element("td")?;
        if let Some(label) = label {
            cell.set_attribute("data-label", label)?;
        }
        cell.set_text_content(Some(text));
        Ok(cell)
    }

    fn build(&self, row: &TableRow) -> Result<Element, JsValue> {
        let tr = self.document.create_element("tr")?;

        match row {
            TableRow::Placeholder { message, colspan } => {
                tr.set_class_name("placeholder-row");
                let cell = self.cell(None, message)?;
                cell.set_attribute("colspan", &colspan.to_string())?;
                tr.append_child(&cell)?;
            }
            TableRow::Contract(contract) => {
                for (label, text) in contract.cells() {
                    if label == "Status" {
                        let cell = self.status_cell(label, contract.status)?;
                        tr.append_child(&cell)?;
                    } else {
                        let cell = self.cell(Some(label), text)?;
                        tr.append_child(&cell)?;
                    }
                }
            }
        }

        Ok(tr)
    }

    fn status_cell(&self, label: &str, status: ContractStatus) -> Result<Element, JsValue> {
        let cell = self.cell(Some(label), "")?;
        let chip = self.document.create_element("span")?;
        let class = match status.class() {
            Some(extra) => format!("status-chip {}", extra),
            None => "status-chip".to_string(),
        };
        chip.set_class_name(&class);
        chip.set_text_content(Some(status.label()));
        cell.append_child(&chip)?;
        Ok(cell)
    }
}

impl TableBody for ContractsBody {
    fn clear_rows(&self) {
        self.body.set_inner_html("");
    }

    fn append_row(&self, row: &TableRow) {
        let appended = self
            .build(row)
            .and_then(|tr| self.body.append_child(&tr).map(|_| ()));
        if let Err(e) = appended {
            tracing::error!("Failed to render contract row: {:?}", e);
        }
    }
}

struct AnchorLink(Element);

impl NavLink for AnchorLink {
    fn route(&self) -> Option<String> {
        self.0.get_attribute("data-route")
    }

    fn set_current(&self, current: bool) {
        let result = if current {
            self.0.set_attribute("aria-current", "page")
        } else {
            self.0.remove_attribute("aria-current")
        };
        if let Err(e) = result {
            tracing::warn!("Failed to update aria-current: {:?}", e);
        }
    }
}

struct WindowLocation(Window);

impl Navigator for WindowLocation {
    fn assign(&self, path: &str) {
        if let Err(e) = self.0.location().set_href(path) {
            tracing::error!("Navigation to {} failed: {:?}", path, e);
        }
    }

    fn replace(&self, path: &str) {
        if let Err(e) = self.0.location().replace(path) {
            tracing::error!("Navigation to {} failed: {:?}", path, e);
        }
    }
}

struct RegisterMessage(Element);

impl MessageTarget for RegisterMessage {
    fn set_message(&self, text: &str) {
        self.0.set_text_content(Some(text));
    }

    fn set_success(&self, success: bool) {
        if let Err(e) = self.0.class_list().toggle_with_force("success", success) {
            tracing::warn!("Failed to mark registration message: {:?}", e);
        }
    }
}

impl ScriptHost for DomPage {
    fn is_marked(&self) -> bool {
        self.document
            .document_element()
            .is_some_and(|root| root.has_attribute(ENHANCER_MARKER))
    }

    fn mark(&self) {
        if let Some(root) = self.document.document_element() {
            if let Err(e) = root.set_attribute(ENHANCER_MARKER, "true") {
                tracing::warn!("Failed to set {}: {:?}", ENHANCER_MARKER, e);
            }
        }
    }

    fn append_script(&self, script: &ScriptTag) {
        let appended = (|| -> Result<(), JsValue> {
            let el: HtmlScriptElement = self.document.create_element("script")?.dyn_into()?;
            el.set_src(&script.src);
            el.set_integrity(&script.integrity);
            el.set_cross_origin(Some(script.cross_origin.as_str()));

            let head = self
                .document
                .head()
                .ok_or_else(|| JsValue::from_str("document has no head"))?;
            head.append_child(&el)?;
            Ok(())
        })();

        if let Err(e) = appended {
            tracing::error!("Failed to append enhancement script: {:?}", e);
        }
    }
}

impl PageHost for DomPage {
    fn metric_slots(&self, id: MetricId) -> MetricSlots {
        let selector = format!("[data-metric=\"{}\"]", id.slot_name());
        let Some(card) = query(&self.document, &selector) else {
            return MetricSlots::default();
        };

        let slot = |selector: &str| {
            query_in(&card, selector).map(|el| Rc::new(ElementText(el)) as Rc<dyn TextSlot>)
        };

        MetricSlots {
            value: slot(".metric-value"),
            detail: slot(".metric-detail-value"),
        }
    }

    fn status_indicator(&self) -> Option<Rc<dyn StatusIndicator>> {
        let el = query(&self.document, "[data-dashboard-status]")?;
        Some(Rc::new(StatusLine(el)))
    }

    fn refresh_control(&self) -> Option<Rc<dyn Toggle>> {
        Some(Rc::new(Button(self.refresh_button()?)))
    }

    fn loading_indicator(&self) -> Option<Rc<dyn LoadingIndicator>> {
        Some(Rc::new(BodyLoading(self.document.body()?)))
    }

    fn contract_table(&self) -> Option<Rc<dyn TableBody>> {
        let body = query(&self.document, "#recent-contracts tbody")?;
        Some(Rc::new(ContractsBody {
            document: self.document.clone(),
            body,
        }))
    }

    fn nav_links(&self) -> Vec<Rc<dyn NavLink>> {
        self.nav_anchors()
            .into_iter()
            .map(|el| Rc::new(AnchorLink(el)) as Rc<dyn NavLink>)
            .collect()
    }

    fn logout_control(&self) -> Option<Rc<dyn Toggle>> {
        Some(Rc::new(Button(self.logout_button()?)))
    }

    fn registration_message(&self) -> Option<Rc<dyn MessageTarget>> {
        let el = self.document.get_element_by_id("register-message")?;
        Some(Rc::new(RegisterMessage(el)))
    }

    fn navigator(&self) -> Rc<dyn Navigator> {
        Rc::new(WindowLocation(self.window.clone()))
    }

    fn location_path(&self) -> String {
        self.window.location().pathname().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revdash::{ContractRow, RefreshPolicy};
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    const MARKUP: &str = r#"
        <div data-dashboard-endpoint="/api/v2/summary" data-refresh-policy="coalesce">
          <p data-dashboard-status></p>
          <div data-metric="users"><span class="metric-value"></span><span class="metric-detail-value"></span></div>
          <table id="recent-contracts"><tbody></tbody></table>
          <nav data-dashboard-nav>
            <a class="side-nav__link" data-route="dashboard" href="/app/dashboard">Dashboard</a>
            <button class="side-nav__link">Collapse</button>
          </nav>
        </div>"#;

    fn page() -> DomPage {
        let page = DomPage::new().expect("browser document");
        page.document()
            .body()
            .expect("body")
            .set_inner_html(MARKUP);
        page
    }

    #[wasm_bindgen_test]
    fn test_frame_attributes_override_config() {
        let page = page();
        let mut config = Config::default();
        page.apply_frame_config(&mut config);

        assert_eq!(config.dashboard.endpoint, "/api/v2/summary");
        assert_eq!(config.dashboard.refresh_policy, RefreshPolicy::Coalesce);
        assert!(page.is_dashboard());
    }

    #[wasm_bindgen_test]
    fn test_resolves_metric_and_status_slots() {
        let page = page();

        let users = page.metric_slots(MetricId::Users);
        users.value.expect("value slot").set_text("1,200");
        assert!(page.metric_slots(MetricId::Bundles).value.is_none());

        page.status_indicator()
            .expect("status line")
            .set_status("Unable to load dashboard data. Retry shortly.", true);
        let status = query(page.document(), "[data-dashboard-status]").expect("status");
        assert_eq!(status.get_attribute("data-error").as_deref(), Some("true"));

        let value = query(page.document(), "[data-metric=\"users\"] .metric-value").expect("value");
        assert_eq!(value.text_content().as_deref(), Some("1,200"));
    }

    #[wasm_bindgen_test]
    fn test_only_anchor_links_are_navigation() {
        let page = page();
        assert_eq!(page.nav_links().len(), 1);
        assert_eq!(page.nav_links()[0].route().as_deref(), Some("dashboard"));
    }

    #[wasm_bindgen_test]
    fn test_contract_row_markup() {
        let page = page();
        let table = page.contract_table().expect("table body");

        let row = ContractRow {
            customer: "Acme".to_string(),
            start: "Jan 2, 2024".to_string(),
            end: "—".to_string(),
            status: ContractStatus::Finalized,
            updated: "just now".to_string(),
        };
        table.clear_rows();
        table.append_row(&TableRow::Contract(row));

        let chip = query(page.document(), "#recent-contracts tbody .status-chip.is-final")
            .expect("status chip");
        assert_eq!(chip.text_content().as_deref(), Some("Finalized"));

        let cell = query(page.document(), "#recent-contracts tbody td[data-label=\"Customer\"]")
            .expect("customer cell");
        assert_eq!(cell.text_content().as_deref(), Some("Acme"));
    }

    #[wasm_bindgen_test]
    fn test_registration_page_state() {
        let page = DomPage::new().expect("browser document");
        let body = page.document().body().expect("body");
        body.set_inner_html(r#"<form id="register-form"></form><p id="register-message"></p>"#);
        body.class_list().add_1(LOADING_CLASS).expect("class list");

        assert!(!page.is_dashboard());

        let loading = page.loading_indicator().expect("body");
        loading.clear();
        assert!(!loading.is_loading());

        let message = page.registration_message().expect("message target");
        message.set_success(true);
        let el = page.document().get_element_by_id("register-message").expect("message");
        assert!(el.class_list().contains("success"));
        message.set_success(false);
        assert!(!el.class_list().contains("success"));

        page.mark();
        assert!(page.is_marked());
    }
}
