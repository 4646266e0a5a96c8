use anyhow::Result;
use chrono::NaiveDate;
use regex::Regex;
use serde_json::json;

use super::{HandlerContext, TaskResponse, Utterance};
use crate::calendar::CalendarEvent;
use crate::extract::EventDraft;

lazy_static::lazy_static! {
    static ref TODAY_QUERY: Regex = Regex::new(r"(?i)what('s| is) (on )?my calendar today").unwrap();
    static ref UPCOMING_QUERY: Regex = Regex::new(r"(?i)upcoming events|what('s| is) coming up").unwrap();
}

pub fn handle(utterance: &Utterance, ctx: &HandlerContext, draft: Option<EventDraft>) -> Result<TaskResponse> {
    if let Some(draft) = draft {
        let event = ctx.calendar.add_event(draft)?;
        return Ok(TaskResponse::ok_with(
            format!(
                "I've added \"{}\" to your calendar for {}{}.",
                event.title,
                short_date(event.date),
                at_time(&event)
            ),
            json!({ "event": event }),
        ));
    }

    let text = utterance.lower();

    if TODAY_QUERY.is_match(text) {
        let events = ctx.calendar.events_by_date(ctx.clock.today())?;
        if events.is_empty() {
            return Ok(TaskResponse::ok("You don't have any events scheduled for today."));
        }

        let list = events
            .iter()
            .map(|e| format!("- {}{}", e.title, at_time(e)))
            .collect::<Vec<_>>()
            .join("\n");
        return Ok(TaskResponse::ok_with(
            format!("Here's your schedule for today:\n{}", list),
            json!({ "events": events }),
        ));
    }

    if UPCOMING_QUERY.is_match(text) {
        let events = ctx.calendar.upcoming_events(ctx.clock.today())?;
        if events.is_empty() {
            return Ok(TaskResponse::ok("You don't have any upcoming events in the next 7 days."));
        }

        let list = events
            .iter()
            .map(|e| format!("- {} on {}{}", e.title, short_date(e.date), at_time(e)))
            .collect::<Vec<_>>()
            .join("\n");
        return Ok(TaskResponse::ok_with(
            format!("Here are your upcoming events for the next 7 days:\n{}", list),
            json!({ "events": events }),
        ));
    }

    Ok(TaskResponse::ok(
        "I can help manage your calendar. Try saying 'Add an event called \"Team Meeting\" on Friday at 2pm' or 'What's on my calendar today?'",
    ))
}

fn short_date(date: NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

fn at_time(event: &CalendarEvent) -> String {
    event
        .time
        .as_ref()
        .map(|t| format!(" at {}", t))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{context, today};
    use chrono::Duration;

    fn draft(title: &str, date: NaiveDate, time: Option<&str>) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            date,
            time: time.map(String::from),
            description: None,
        }
    }

    #[test]
    fn test_add_echoes_title_date_time() {
        let ctx = context(None);
        let r = handle(
            &Utterance::new("ignored"),
            &ctx,
            Some(draft("Team Meeting", today(), Some("3pm"))),
        )
        .unwrap();
        assert!(r.success);
        assert_eq!(r.message, "I've added \"Team Meeting\" to your calendar for 1/1/2024 at 3pm.");
        assert_eq!(ctx.calendar.events().unwrap().len(), 1);
    }

    #[test]
    fn test_today_listing() {
        let ctx = context(None);
        let empty = handle(&Utterance::new("What's on my calendar today?"), &ctx, None).unwrap();
        assert_eq!(empty.message, "You don't have any events scheduled for today.");

        ctx.calendar.add_event(draft("Standup", today(), Some("9am"))).unwrap();
        ctx.calendar
            .add_event(draft("Tomorrow thing", today() + Duration::days(1), None))
            .unwrap();
        let r = handle(&Utterance::new("what is on my calendar today"), &ctx, None).unwrap();
        assert_eq!(r.message, "Here's your schedule for today:\n- Standup at 9am");
    }

    #[test]
    fn test_upcoming_listing_sorted() {
        let ctx = context(None);
        ctx.calendar
            .add_event(draft("Later", today() + Duration::days(6), None))
            .unwrap();
        ctx.calendar
            .add_event(draft("Sooner", today() + Duration::days(2), Some("10am")))
            .unwrap();
        ctx.calendar
            .add_event(draft("Way later", today() + Duration::days(30), None))
            .unwrap();

        let r = handle(&Utterance::new("what's coming up"), &ctx, None).unwrap();
        assert_eq!(
            r.message,
            "Here are your upcoming events for the next 7 days:\n- Sooner on 1/3/2024 at 10am\n- Later on 1/7/2024"
        );
    }

    #[test]
    fn test_hint() {
        let ctx = context(None);
        let r = handle(&Utterance::new("calendar"), &ctx, None).unwrap();
        assert!(r.success);
        assert!(r.message.starts_with("I can help manage your calendar."));
    }
}
