//! Built-in post-deployment scenarios for the tour site.
//!
//! Each scenario is plain data built from [`ScenarioParams`], so the same
//! flows can be pointed at any deployment (credentials, contact number and
//! fixture names all come from configuration).

use crate::cleanup::CleanupSpec;
use crate::locator::Locator;
use crate::scenario::{Action, Scenario, Step};
use crate::wait::Condition;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Fixture for the tour created by `full-features`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TourFixture {
    /// Title (doubles as the cleanup marker)
    pub title: String,
    /// Location field
    pub location: String,
    /// Category option
    pub category: String,
    /// Price field
    pub price: String,
    /// Days field
    pub days: String,
    /// Nights field
    pub nights: String,
    /// Description textarea
    pub description: String,
    /// Main image to upload
    pub image: PathBuf,
    /// Name of the added destination
    pub destination: String,
    /// Name of the added activity
    pub activity: String,
    /// Title of the added itinerary day
    pub itinerary_day: String,
}

impl Default for TourFixture {
    fn default() -> Self {
        Self {
            title: "Verification Tour".into(),
            location: "Test Location".into(),
            category: "Adventure".into(),
            price: "500".into(),
            days: "3".into(),
            nights: "2".into(),
            description: "This is a test tour for verification.".into(),
            image: PathBuf::from("assets/logo.png"),
            destination: "Test Destination 1".into(),
            activity: "Test Activity 1".into(),
            itinerary_day: "Day 1 Arrival".into(),
        }
    }
}

/// Fixture for the pin added by `map-pin`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinFixture {
    /// Pin name
    pub name: String,
    /// Pin description
    pub description: String,
}

impl Default for PinFixture {
    fn default() -> Self {
        Self {
            name: "Test Pin Kandy".into(),
            description: "This is a test description for Kandy.".into(),
        }
    }
}

/// Inputs shared by the built-in scenarios
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    /// Admin username
    pub username: String,
    /// Admin password
    pub password: String,
    /// WhatsApp number written to settings and expected on the home page
    pub whatsapp_number: String,
    /// Tour fixture
    pub tour: TourFixture,
    /// Map pin fixture
    pub pin: PinFixture,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            username: "admin".into(),
            password: "admin123".into(),
            whatsapp_number: "94779998888".into(),
            tour: TourFixture::default(),
            pin: PinFixture::default(),
        }
    }
}

/// Names and one-line descriptions of the built-in scenarios
pub const BUILTIN: &[(&str, &str)] = &[
    ("login", "Sign in and see the dashboard"),
    (
        "admin-pages",
        "Tour form sections, settings fields and the home contact bubble render",
    ),
    (
        "full-features",
        "Update settings, create a tour, verify it publicly, then delete it",
    ),
    (
        "map-pin",
        "Add a map pin, check the public map page, then delete the pin",
    ),
];

/// Build a built-in scenario by name
#[must_use]
pub fn builtin(name: &str, params: &ScenarioParams) -> Option<Scenario> {
    let scenario = match name {
        "login" => login(params),
        "admin-pages" => admin_pages(params),
        "full-features" => full_features(params),
        "map-pin" => map_pin(params),
        _ => return None,
    };
    Some(scenario)
}

/// Every built-in scenario, in listing order
#[must_use]
pub fn all(params: &ScenarioParams) -> Vec<Scenario> {
    BUILTIN
        .iter()
        .filter_map(|(name, _)| builtin(name, params))
        .collect()
}

fn description_of(name: &str) -> &'static str {
    BUILTIN
        .iter()
        .find(|(n, _)| *n == name)
        .map_or("", |(_, d)| d)
}

fn button(text: &str) -> Locator {
    Locator::css("button").with_text(text)
}

/// Sign in through the login form; `landed` is checked after submitting
#[must_use]
pub fn login_steps(params: &ScenarioParams, landed: Condition) -> Vec<Step> {
    vec![
        Step::new("Open login page")
            .navigate("/login")
            .expect(Condition::visible(Locator::css(r#"input[type="password"]"#))),
        Step::new("Enter username").fill(Locator::css(r#"input[type="text"]"#), &params.username),
        Step::new("Enter password")
            .fill(Locator::css(r#"input[type="password"]"#), &params.password),
        Step::new("Submit credentials")
            .click(Locator::css(r#"button[type="submit"]"#))
            .expect(landed)
            .with_timeout(Duration::from_secs(10)),
    ]
}

fn login_to_admin(params: &ScenarioParams) -> Vec<Step> {
    login_steps(params, Condition::url_glob("**/admin"))
}

/// `login`
#[must_use]
pub fn login(params: &ScenarioParams) -> Scenario {
    Scenario::new("login")
        .describe(description_of("login"))
        .steps(login_steps(
            params,
            Condition::visible(Locator::text("Dashboard Overview")),
        ))
}

/// `admin-pages`
#[must_use]
pub fn admin_pages(params: &ScenarioParams) -> Scenario {
    Scenario::new("admin-pages")
        .describe(description_of("admin-pages"))
        .steps(login_steps(
            params,
            Condition::visible(Locator::text("Dashboard Overview")),
        ))
        .step(
            Step::new("Tour form shows destinations section")
                .navigate("/admin/tours/new")
                .expect(Condition::visible(Locator::text("Destinations (with Images)"))),
        )
        .step(
            Step::new("Tour form shows activities section")
                .expect(Condition::visible(Locator::text("Activities (with Images)")))
                .checkpoint("tour_form_verification", true),
        )
        .step(
            Step::new("Settings shows social links")
                .navigate("/admin/settings")
                .expect(Condition::visible(Locator::text("Social Media Links"))),
        )
        .step(
            Step::new("Settings shows WhatsApp field")
                .expect(Condition::visible(Locator::text("WhatsApp Number"))),
        )
        .step(
            Step::new("Home shows contact bubble")
                .navigate("/")
                .settle(Duration::from_secs(2))
                .expect(Condition::visible(Locator::label("Chat on WhatsApp")))
                .checkpoint("home_verification", false),
        )
}

/// `full-features`
#[must_use]
pub fn full_features(params: &ScenarioParams) -> Scenario {
    let tour = &params.tour;
    let card = Locator::css(".group").with_text(&tour.title);
    let name_field = Locator::css(r#"input[placeholder="Name"]"#).last();

    Scenario::new("full-features")
        .describe(description_of("full-features"))
        .steps(login_to_admin(params))
        // Settings
        .step(
            Step::new("Set WhatsApp number")
                .navigate("/admin/settings")
                .fill(Locator::css(r#"input[name="whatsapp"]"#), &params.whatsapp_number),
        )
        .step(
            Step::new("Save settings")
                .click(button("Save Changes"))
                .expect(Condition::visible(Locator::text("Settings updated successfully"))),
        )
        // Tour basics
        .step(
            Step::new("Enter tour title")
                .navigate("/admin/tours/new")
                .fill(Locator::css(r#"input[name="title"]"#), &tour.title),
        )
        .step(Step::new("Enter location").fill(Locator::css(r#"input[name="location"]"#), &tour.location))
        .step(Step::new("Choose category").select(Locator::css(r#"select[name="category"]"#), &tour.category))
        .step(Step::new("Enter price").fill(Locator::css(r#"input[name="price"]"#), &tour.price))
        .step(Step::new("Enter days").fill(Locator::css(r#"input[name="days"]"#), &tour.days))
        .step(Step::new("Enter nights").fill(Locator::css(r#"input[name="nights"]"#), &tour.nights))
        .step(
            Step::new("Enter description")
                .fill(Locator::css(r#"textarea[name="description"]"#), &tour.description),
        )
        .step(
            Step::new("Upload main image")
                .upload(Locator::css(r#"input[type="file"]"#).first(), tour.image.clone()),
        )
        // Repeatable sections: the new row is always the last input
        .step(Step::new("Add destination").click(button("+ Add Destination")))
        .step(Step::new("Name destination").fill(name_field.clone(), &tour.destination))
        .step(Step::new("Add activity").click(button("+ Add Activity")))
        .step(Step::new("Name activity").fill(name_field, &tour.activity))
        .step(Step::new("Add itinerary day").click(button("+ Add Day")))
        .step(
            Step::new("Title itinerary day").fill(
                Locator::css(r#"input[placeholder="Title (e.g., Arrival in Colombo)"]"#).last(),
                &tour.itinerary_day,
            ),
        )
        .step(
            Step::new("Create tour")
                .click(button("Create Tour"))
                .expect(Condition::url_glob("**/admin/tours")),
        )
        // Public site
        .step(
            Step::new("Home links to WhatsApp number")
                .navigate("/")
                .expect(Condition::visible(Locator::css(format!(
                    r#"a[href*="wa.me/{}"]"#,
                    params.whatsapp_number
                )))),
        )
        .step(
            Step::new("Tour card is listed")
                .navigate("/tours")
                .expect(Condition::visible(card.clone())),
        )
        .step(
            Step::new("Open tour details")
                .click(card.locator(Locator::text("View Details")))
                .expect(Condition::visible(Locator::css("h1").with_text(&tour.title))),
        )
        .step(
            Step::new("Destinations tab starts closed")
                .expect(Condition::hidden(Locator::text(&tour.destination))),
        )
        .step(
            Step::new("Destinations tab reveals destination")
                .click(button("Destinations"))
                .expect(Condition::visible(Locator::text(&tour.destination))),
        )
        .step(
            Step::new("Itinerary tab reveals day")
                .click(button("Itinerary"))
                .expect(Condition::visible(Locator::text(&tour.itinerary_day)))
                .checkpoint("full_feature_verification", true),
        )
        .with_cleanup(
            CleanupSpec::new(&tour.title)
                .on_page("/admin/tours")
                .with_setup(login_to_admin(params)),
        )
}

/// `map-pin`
#[must_use]
pub fn map_pin(params: &ScenarioParams) -> Scenario {
    let pin = &params.pin;
    Scenario::new("map-pin")
        .describe(description_of("map-pin"))
        .steps(login_to_admin(params))
        .step(
            Step::new("Open map manager")
                .navigate("/admin/map")
                .expect(Condition::visible(
                    Locator::css("h2").with_text("Interactive Map Manager"),
                )),
        )
        .step(Step::new("Place pin on map").click(Locator::css(r#"img[alt="Map"]"#)))
        .step(Step::new("Open pin form").click(button("Add New Pin")))
        .step(Step::new("Enter pin name").fill(Locator::css(r#"input[type="text"]"#), &pin.name))
        .step(Step::new("Enter pin description").fill(Locator::css("textarea"), &pin.description))
        .step(
            Step::new("Save pin")
                .click(button("Save"))
                .settle(Duration::from_secs(1)),
        )
        .step(
            Step::new("Public map renders")
                .navigate("/")
                .expect(Condition::visible(
                    Locator::css("h2").with_text("Explore Our Destinations"),
                ))
                .checkpoint("map_verification", true),
        )
        .with_cleanup(
            CleanupSpec::new(&pin.name)
                .on_page("/admin/map")
                .with_row(Locator::test_id("pin-list").locator(Locator::css("div.cursor-pointer")))
                .with_delete(Locator::css("span"))
                .then(Action::Click {
                    locator: button("Delete Pin"),
                })
                .with_setup(login_to_admin(params)),
        )
}
