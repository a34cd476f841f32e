//! In-memory stand-in for the tour site, used by scenario and orchestrator tests.
//!
//! Pages and behaviors follow what the built-in scenarios expect: login
//! redirecting to the dashboard, a settings form, a tour form with
//! repeatable sections and an upload, a public list with detail tabs, an
//! admin list with confirm-gated deletion, and a map manager whose pins are
//! deleted by selecting one and confirming "Delete Pin".

use crate::locator::Locator;
use crate::mock::{MockDom, MockDriver, MockStore, NodeId};
use crate::scenarios::ScenarioParams;

const TOURS: &str = "tours";
const SELECTED: &str = "selected";
const PINS: &str = "pins";
const EDITING_PIN: &str = "editing_pin";

fn first<'a>(store: &'a MockStore, key: &str) -> Option<&'a String> {
    store.get(key).and_then(|v| v.first())
}

fn values_within(dom: &MockDom, container: &str, field: &str) -> Vec<String> {
    dom.query(&Locator::test_id(container).locator(Locator::css(field)))
        .into_iter()
        .map(|id| dom.value(id).to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn append_input(dom: &mut MockDom, container: &str, placeholder: &str) {
    if let Some(list) = dom.pick(&Locator::test_id(container)) {
        dom.add(list, "input").attr("placeholder", placeholder);
    }
}

fn card_title(dom: &MockDom, node: NodeId) -> Option<String> {
    let mut current = Some(node);
    while let Some(id) = current {
        if let Some(title) = dom.attr(id, "data-title") {
            return Some(title.to_string());
        }
        current = dom.parent(id);
    }
    None
}

/// Build the site; credentials come from `params`
pub fn tour_site(params: &ScenarioParams) -> MockDriver {
    let driver = MockDriver::new();
    driver.seed("whatsapp", &["94770000000"]);
    driver.seed(TOURS, &["Cultural Triangle"]);

    // --- auth ---
    driver.route("/login", |dom, _| {
        let root = dom.root();
        let form = dom.add(root, "form").id();
        dom.add(form, "input").attr("type", "text");
        dom.add(form, "input").attr("type", "password");
        dom.add(form, "button").attr("type", "submit").text("Sign In");
    });
    let (user, pass) = (params.username.clone(), params.password.clone());
    driver.on_click(
        Locator::css(r#"button[type="submit"]"#),
        move |dom, store, _| {
            let u = dom.value_of(&Locator::css(r#"input[type="text"]"#)).unwrap_or_default();
            let p = dom.value_of(&Locator::css(r#"input[type="password"]"#)).unwrap_or_default();
            if u == user && p == pass {
                store.insert("session".into(), vec![u]);
                dom.redirect("/admin");
            } else {
                let root = dom.root();
                dom.add(root, "p").text("Invalid username or password");
            }
        },
    );
    driver.route("/admin", |dom, store| {
        let root = dom.root();
        if store.contains_key("session") {
            dom.add(root, "h1").text("Dashboard Overview");
        } else {
            dom.add(root, "p").text("Please sign in");
        }
    });

    // --- settings ---
    driver.route("/admin/settings", |dom, store| {
        let root = dom.root();
        dom.add(root, "h2").text("Social Media Links");
        dom.add(root, "label").attr("for", "whatsapp").text("WhatsApp Number");
        dom.add(root, "input")
            .attr("id", "whatsapp")
            .attr("name", "whatsapp")
            .value(first(store, "whatsapp").map_or("", String::as_str));
        dom.add(root, "button").text("Save Changes");
    });
    driver.on_click(Locator::css("button").with_text("Save Changes"), |dom, store, _| {
        let number = dom
            .value_of(&Locator::css(r#"input[name="whatsapp"]"#))
            .unwrap_or_default();
        store.insert("whatsapp".into(), vec![number]);
        let root = dom.root();
        dom.add(root, "p").text("Settings updated successfully");
    });

    // --- tour form ---
    driver.route("/admin/tours/new", |dom, _| {
        let root = dom.root();
        let form = dom.add(root, "form").id();
        for name in ["title", "location", "price", "days", "nights"] {
            dom.add(form, "input").attr("name", name);
        }
        let select = dom.add(form, "select").attr("name", "category").id();
        for option in ["Cultural", "Adventure", "Beach"] {
            dom.add(select, "option").attr("value", option).text(option);
        }
        dom.add(form, "textarea").attr("name", "description");
        dom.add(form, "input").attr("type", "file");
        for (heading, testid, button) in [
            ("Destinations (with Images)", "destinations", "+ Add Destination"),
            ("Activities (with Images)", "activities", "+ Add Activity"),
            ("Itinerary", "itinerary", "+ Add Day"),
        ] {
            let section = dom.add(form, "section").id();
            dom.add(section, "h3").text(heading);
            dom.add(section, "div").attr("data-testid", testid);
            dom.add(section, "button").attr("type", "button").text(button);
        }
        dom.add(form, "button").text("Create Tour");
    });
    driver.on_click(Locator::css("button").with_text("+ Add Destination"), |dom, _, _| {
        append_input(dom, "destinations", "Name");
    });
    driver.on_click(Locator::css("button").with_text("+ Add Activity"), |dom, _, _| {
        append_input(dom, "activities", "Name");
    });
    driver.on_click(Locator::css("button").with_text("+ Add Day"), |dom, _, _| {
        append_input(dom, "itinerary", "Title (e.g., Arrival in Colombo)");
    });
    driver.on_click(Locator::css("button").with_text("Create Tour"), |dom, store, _| {
        let title = dom
            .value_of(&Locator::css(r#"input[name="title"]"#))
            .unwrap_or_default();
        if title.is_empty() {
            let root = dom.root();
            dom.add(root, "p").text("Title is required");
            return;
        }
        let destinations = values_within(dom, "destinations", "input");
        let itinerary = values_within(dom, "itinerary", "input");
        store.entry(TOURS.into()).or_default().push(title.clone());
        store.insert(format!("{title}/destinations"), destinations);
        store.insert(format!("{title}/itinerary"), itinerary);
        dom.redirect("/admin/tours");
    });

    // --- admin list ---
    driver.route("/admin/tours", |dom, store| {
        let root = dom.root();
        let table = dom.add(root, "table").id();
        for (i, title) in store.get(TOURS).into_iter().flatten().enumerate() {
            let row = dom.add(table, "tr").attr("data-index", &i.to_string()).id();
            dom.add(row, "td").text(title);
            dom.add(row, "button").text("Delete");
        }
    });
    driver.on_confirmed_click(
        Locator::css("tr button"),
        "Are you sure you want to delete this tour?",
        |dom, store, node| {
            let index = dom
                .closest(node, "tr")
                .and_then(|tr| dom.attr(tr, "data-index"))
                .and_then(|i| i.parse::<usize>().ok());
            if let (Some(i), Some(tours)) = (index, store.get_mut(TOURS)) {
                if i < tours.len() {
                    tours.remove(i);
                }
            }
            dom.redirect("/admin/tours");
        },
    );

    // --- public site ---
    driver.route("/", |dom, store| {
        let root = dom.root();
        dom.add(root, "h2").text("Explore Our Destinations");
        for pin in store.get(PINS).into_iter().flatten() {
            dom.add(root, "div")
                .class("rounded-full border-2 border-white")
                .attr("title", pin);
        }
        let number = first(store, "whatsapp").map_or("", String::as_str);
        dom.add(root, "a")
            .attr("aria-label", "Chat on WhatsApp")
            .attr("href", &format!("https://wa.me/{number}"))
            .text("Chat");
    });
    driver.route("/tours", |dom, store| {
        let root = dom.root();
        for title in store.get(TOURS).into_iter().flatten() {
            let card = dom
                .add(root, "div")
                .class("group rounded-xl")
                .attr("data-title", title)
                .id();
            dom.add(card, "h3").text(title);
            dom.add(card, "a").text("View Details");
        }
    });
    driver.on_click(Locator::text("View Details"), |dom, store, node| {
        if let Some(title) = card_title(dom, node) {
            store.insert(SELECTED.into(), vec![title]);
            dom.redirect("/tours/detail");
        }
    });
    driver.route("/tours/detail", |dom, store| {
        let root = dom.root();
        let Some(title) = first(store, SELECTED) else {
            dom.add(root, "h1").text("Tour not found");
            return;
        };
        dom.add(root, "h1").text(title);
        for tab in ["Overview", "Destinations", "Itinerary"] {
            dom.add(root, "button").text(tab);
        }
        for (testid, key) in [("tab-destinations", "destinations"), ("tab-itinerary", "itinerary")] {
            let panel = dom.add(root, "div").attr("data-testid", testid).hidden().id();
            for item in store.get(&format!("{title}/{key}")).into_iter().flatten() {
                dom.add(panel, "p").text(item);
            }
        }
    });
    for (tab, panel) in [("Destinations", "tab-destinations"), ("Itinerary", "tab-itinerary")] {
        driver.on_click(Locator::css("button").with_text(tab), move |dom, _, _| {
            for other in ["tab-destinations", "tab-itinerary"] {
                if let Some(id) = dom.pick(&Locator::test_id(other)) {
                    dom.set_hidden(id, other != panel);
                }
            }
        });
    }

    // --- map ---
    driver.route("/admin/map", |dom, store| {
        let root = dom.root();
        dom.add(root, "h2").text("Interactive Map Manager");
        let map = dom.add(root, "div").id();
        dom.add(map, "img").attr("alt", "Map");
        let pins = store.get(PINS).cloned().unwrap_or_default();
        for name in &pins {
            dom.add(map, "div")
                .class("rounded-full cursor-pointer")
                .attr("title", name);
        }
        dom.add(root, "button").text("Add New Pin");
        let form = dom.add(root, "div").attr("data-testid", "pin-form").hidden().id();
        dom.add(form, "input").attr("type", "text");
        dom.add(form, "textarea");
        dom.add(form, "button").attr("data-testid", "save-pin").text("Save");
        dom.add(root, "button").attr("data-testid", "delete-pin").text("Delete Pin").hidden();
        let list = dom.add(root, "div").attr("data-testid", "pin-list").id();
        dom.add(list, "h4").text(&format!("All Pins ({})", pins.len()));
        for (i, name) in pins.iter().enumerate() {
            let entry = dom
                .add(list, "div")
                .class("p-2 border rounded cursor-pointer")
                .attr("data-index", &i.to_string())
                .id();
            dom.add(entry, "span").text(name);
        }
    });
    driver.on_click(Locator::css(r#"img[alt="Map"]"#), |_, store, _| {
        store.insert("pin_position".into(), vec!["0.5,0.5".into()]);
    });
    driver.on_click(Locator::css("button").with_text("Add New Pin"), |dom, _, _| {
        if let Some(form) = dom.pick(&Locator::test_id("pin-form")) {
            dom.set_hidden(form, false);
        }
    });
    driver.on_click(Locator::test_id("save-pin"), |dom, store, _| {
        let name = dom
            .value_of(&Locator::css(r#"input[type="text"]"#))
            .unwrap_or_default();
        if store.contains_key("pin_position") && !name.is_empty() {
            store.entry(PINS.into()).or_default().push(name);
        }
    });
    driver.on_click(
        Locator::test_id("pin-list").locator(Locator::css("div.cursor-pointer")),
        |dom, store, node| {
            let index = dom
                .closest(node, "div")
                .and_then(|entry| dom.attr(entry, "data-index"))
                .map(str::to_string);
            if let Some(index) = index {
                store.insert(EDITING_PIN.into(), vec![index]);
                if let Some(button) = dom.pick(&Locator::test_id("delete-pin")) {
                    dom.set_hidden(button, false);
                }
            }
        },
    );
    driver.on_confirmed_click(Locator::test_id("delete-pin"), "Are you sure?", |dom, store, _| {
        let index = store
            .remove(EDITING_PIN)
            .and_then(|v| v.first().and_then(|i| i.parse::<usize>().ok()));
        if let (Some(i), Some(pins)) = (index, store.get_mut(PINS)) {
            if i < pins.len() {
                pins.remove(i);
            }
        }
        dom.redirect("/admin/map");
    });

    driver
}
