use anyhow::Result;
use chrono::Datelike;
use smartcal::App;
use smartcal_core::Config;
use smartcal_store::month_name;
use smartcal_weather::icon_glyph;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    smartcal_core::init()?;

    let (config, _) = Config::load_validated()?;
    let app = App::new(config)?;
    app.initialize()?;

    tracing::info!("smartcal started");

    let offset = app.store().display_offset();
    let agenda = app.month_agenda();
    let month = app.store().current_date().with_timezone(&offset);

    println!("{}", month.format("%B %Y"));
    if agenda.is_empty() {
        println!("  No reminders this month");
    }
    for (day, reminders) in agenda {
        println!(
            "  {} {} {}",
            day.format("%a"),
            month_name(day.month()).unwrap_or_default(),
            day.day()
        );
        for reminder in reminders {
            let time = reminder.date.with_timezone(&offset).format("%H:%M");
            let weather = reminder
                .weather
                .as_ref()
                .map(|w| {
                    let glyph = w.icon.as_deref().map_or("", icon_glyph);
                    format!(" {} {:.0}° {}", glyph, w.temperature, w.forecast)
                })
                .unwrap_or_default();
            let city = if reminder.city.is_empty() {
                String::new()
            } else {
                format!(" ({})", reminder.city)
            };
            println!("    {} {}{}{}", time, reminder.text, city, weather);
        }
    }

    for notification in app.drain_notifications() {
        tracing::info!("{:?}: {}", notification.severity, notification.message);
    }

    // Graceful shutdown
    app.shutdown()?;

    Ok(())
}
