use crate::coordinate::Coordinate;
use crate::resolver::{Origin, Resolution};
use crate::output::is_quiet;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(icon: &str, text: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", icon, text.style(theme().heading.clone()));
}

pub fn success(label: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::CHECK, label.style(theme().ok.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().problem.clone()));
}

pub fn warn(label: &str) {
    if is_quiet() {
        return;
    }
    eprintln!("{} {}", Icons::WARN, label.style(theme().caution.clone()));
}

pub fn info(label: &str, value: &str) {
    if is_quiet() {
        return;
    }
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().label.clone()),
        label.style(theme().label.clone()),
        value
    );
}

/// Print a coordinate with the label saying where it came from.
pub fn coordinate(icon: &str, label: &str, c: &Coordinate) {
    if is_quiet() {
        return;
    }
    println!(
        "{} {} {}",
        icon,
        format!("{:.6}, {:.6}", c.latitude, c.longitude).style(theme().coordinate.clone()),
        format!("({})", label).style(theme().label.clone())
    );
}

/// Print a resolved coordinate tagged with its origin, plus the live-fix failure if any.
pub fn resolution(resolution: &Resolution) {
    if is_quiet() {
        return;
    }
    let icon = match resolution.origin {
        Origin::Stored => Icons::DATABASE,
        Origin::Live => Icons::SATELLITE,
        Origin::Fallback => Icons::GEAR,
    };
    let c = resolution.coordinate;
    println!(
        "{} {} {}",
        icon,
        format!("{:.6}, {:.6}", c.latitude, c.longitude).style(theme().coordinate.clone()),
        format!("({})", resolution.origin.as_str()).style(theme().origin(resolution.origin).clone())
    );
    if let Some(kind) = resolution.failure {
        info("Live fix failed", kind.message());
    }
}
