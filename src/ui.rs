use crate::catalog::Event;
use crate::models::SlotView;
use crate::views::{MAIN_SECTION, MEMBERS_SECTION, SectionVisibility};

pub struct EventPanel<'a> {
    pub event: &'a Event,
    pub slots: Vec<SlotView>,
}

pub fn render_page(sections: &[SectionVisibility], panels: &[EventPanel<'_>], notice: Option<&str>) -> String {
    let display = |id: &str| {
        let visible = sections.iter().any(|section| section.id == id && section.visible);
        if visible { "" } else { " style=\"display:none\"" }
    };

    let mut body = String::new();
    body.push_str(&render_main(display(MAIN_SECTION), panels));
    for panel in panels {
        body.push_str(&render_event(display(&panel.event.id), panel));
    }
    body.push_str(&render_members(display(MEMBERS_SECTION)));

    let toast = notice
        .and_then(notice_message)
        .map(|(message, kind)| {
            format!(r#"<div class="toast" id="toast" data-type="{kind}">{}</div>"#, escape_html(message))
        })
        .unwrap_or_default();

    PAGE_HTML
        .replace("{{SECTIONS}}", &body)
        .replace("{{TOAST}}", &toast)
}

/// Maps a redirect notice code to the message shown in the toast.
pub fn notice_message(code: &str) -> Option<(&'static str, &'static str)> {
    let entry = match code {
        "registered" => ("You're booked! We'll see you at the pool.", "ok"),
        "cancelled" => ("Your reservation has been cancelled.", "ok"),
        "full" => ("Sorry, that time slot just filled up. Please pick another.", "error"),
        "passed" => ("That time slot has already passed.", "error"),
        "unknown-slot" => ("Please select a time slot first.", "error"),
        "missing-field" => ("Please fill in the child's name, a phone number and a time slot.", "error"),
        "not-found" => ("We couldn't find a reservation for that child in this slot.", "error"),
        "email-mismatch" => ("The email doesn't match the one used to book.", "error"),
        "not-authorized" => ("Only an administrator can do that.", "error"),
        _ => return None,
    };
    Some(entry)
}

fn render_main(style: &str, panels: &[EventPanel<'_>]) -> String {
    let cards: String = panels
        .iter()
        .map(|panel| {
            let open = panel.slots.iter().filter(|slot| slot.state.is_bookable()).count();
            format!(
                r#"<article class="card">
          <h2>{label}</h2>
          <p class="muted">{location}</p>
          <p class="muted">{dates}</p>
          <p>{open} of {total} time slots open</p>
          <a class="btn" href="/events/{id}" data-section="{id}">View times</a>
        </article>"#,
                label = escape_html(&panel.event.label),
                location = escape_html(&panel.event.location),
                dates = escape_html(&panel.event.date_labels().join(" · ")),
                total = panel.slots.len(),
                id = escape_html(&panel.event.id),
            )
        })
        .collect();

    format!(
        r#"<section class="page" id="{MAIN_SECTION}"{style}>
      <header>
        <h1>Swim With A Splash</h1>
        <p class="subtitle">Small-group swim lessons, two swimmers per instructor.</p>
      </header>
      <div class="cards">{cards}</div>
      <p><a href="/members" data-section="{MEMBERS_SECTION}">Meet the team</a></p>
    </section>"#
    )
}

fn render_event(style: &str, panel: &EventPanel<'_>) -> String {
    let id = escape_html(&panel.event.id);
    let buttons: String = panel
        .slots
        .iter()
        .map(|slot| {
            let disabled = if slot.state.is_bookable() { "" } else { " disabled" };
            format!(
                r#"<button type="button" class="slot {class}" id="slot-{id}-{key}" data-slot="{key}" data-state="{state}"{disabled}>{label}<small>{caption}</small></button>"#,
                class = slot.state.css_class(),
                key = escape_html(&slot.key),
                state = slot.state.as_str(),
                label = escape_html(&slot.label),
                caption = slot.state.caption(),
            )
        })
        .collect();

    format!(
        r#"<section class="page event" id="{id}" data-event="{id}"{style}>
      <a class="back" href="/" data-section="{MAIN_SECTION}">&larr; Back</a>
      <header>
        <h1>{label}</h1>
        <p class="subtitle">{location} · {dates}</p>
      </header>
      <div class="slots">{buttons}</div>
      <form class="register" method="post" action="/events/{id}/register">
        <input type="hidden" name="slot" value="" />
        <label>Child's name <input name="childName" required /></label>
        <label>Age <input name="age" inputmode="numeric" /></label>
        <label>Swimming level
          <select name="swimmingLevel">
            <option value="beginner">Beginner</option>
            <option value="intermediate">Intermediate</option>
            <option value="advanced">Advanced</option>
          </select>
        </label>
        <label>Goals <textarea name="goals" rows="2"></textarea></label>
        <label>Phone <input name="phone" type="tel" required /></label>
        <label>Email <input name="email" type="email" /></label>
        <label>Anything else we should know? <textarea name="additionalInfo" rows="2"></textarea></label>
        <button class="btn" type="submit">Book selected time</button>
      </form>
      <details class="cancel">
        <summary>Need to cancel?</summary>
        <form method="post" action="/events/{id}/cancel">
          <label>Time slot <select name="slot">{options}</select></label>
          <label>Child's name <input name="childName" required /></label>
          <label>Email used to book <input name="email" type="email" required /></label>
          <button class="btn secondary" type="submit">Cancel reservation</button>
        </form>
      </details>
    </section>"#,
        label = escape_html(&panel.event.label),
        location = escape_html(&panel.event.location),
        dates = escape_html(&panel.event.date_labels().join(" · ")),
        options = panel
            .slots
            .iter()
            .map(|slot| format!(
                r#"<option value="{}">{}</option>"#,
                escape_html(&slot.key),
                escape_html(&slot.label)
            ))
            .collect::<String>(),
    )
}

fn render_members(style: &str) -> String {
    format!(
        r#"<section class="page" id="{MEMBERS_SECTION}"{style}>
      <a class="back" href="/" data-section="{MAIN_SECTION}">&larr; Back</a>
      <header>
        <h1>Our instructors</h1>
        <p class="subtitle">Certified lifeguards and swim coaches who love the water.</p>
      </header>
      <p>Every lesson pairs one instructor with at most two swimmers, so each child gets real attention in the pool.</p>
    </section>"#
    )
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Swim With A Splash</title>
  <style>
    :root {
      --bg-1: #e6f7fb;
      --bg-2: #9edcf0;
      --ink: #123040;
      --accent: #0a8fbf;
      --accent-2: #f2994a;
      --card: rgba(255, 255, 255, 0.9);
      --shadow: 0 24px 60px rgba(18, 48, 64, 0.16);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(160deg, var(--bg-1), #f4fcff 70%);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      display: grid;
      place-items: start center;
      padding: 32px 18px 48px;
    }

    .page {
      width: min(900px, 100%);
      background: var(--card);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: flex;
      flex-direction: column;
      gap: 24px;
    }

    h1 {
      font-family: "Georgia", serif;
      font-size: clamp(2rem, 4vw, 2.6rem);
      margin: 0;
    }

    .subtitle,
    .muted {
      margin: 0;
      color: #4f6b78;
    }

    .cards {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(240px, 1fr));
      gap: 16px;
    }

    .card {
      background: white;
      border-radius: 18px;
      padding: 20px;
      border: 1px solid rgba(18, 48, 64, 0.08);
      display: grid;
      gap: 8px;
    }

    .card h2 {
      margin: 0;
    }

    .btn {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 12px 18px;
      font-size: 1rem;
      font-weight: 600;
      background: var(--accent);
      color: white;
      text-decoration: none;
      text-align: center;
      cursor: pointer;
    }

    .btn.secondary {
      background: var(--accent-2);
    }

    .slots {
      display: grid;
      grid-template-columns: repeat(auto-fill, minmax(150px, 1fr));
      gap: 10px;
    }

    .slot {
      border-radius: 14px;
      border: 2px solid transparent;
      padding: 12px;
      font-size: 0.95rem;
      display: grid;
      gap: 4px;
      cursor: pointer;
    }

    .slot small {
      font-size: 0.75rem;
    }

    .slot.available {
      background: #e3f6ec;
      color: #1f6b45;
    }

    .slot[data-state="one-left"] {
      background: #fff4e0;
      color: #8a5a12;
    }

    .slot.booked {
      background: #f3e1e1;
      color: #8d2f2f;
      cursor: not-allowed;
    }

    .slot.passed {
      background: #eceff1;
      color: #7d8b92;
      cursor: not-allowed;
    }

    .slot.selected {
      border-color: var(--accent);
    }

    form {
      display: grid;
      gap: 12px;
    }

    label {
      display: grid;
      gap: 4px;
      font-size: 0.9rem;
    }

    input,
    select,
    textarea {
      font: inherit;
      padding: 10px;
      border-radius: 10px;
      border: 1px solid rgba(18, 48, 64, 0.2);
    }

    .toast {
      position: fixed;
      bottom: 24px;
      left: 50%;
      transform: translateX(-50%);
      padding: 14px 22px;
      border-radius: 999px;
      background: #1f6b45;
      color: white;
      box-shadow: var(--shadow);
      transition: opacity 400ms ease;
    }

    .toast[data-type="error"] {
      background: #c63b2b;
    }

    @media (max-width: 600px) {
      .page {
        padding: 24px 18px;
      }
    }
  </style>
</head>
<body>
  {{SECTIONS}}
  {{TOAST}}

  <script>
    const pages = Array.from(document.querySelectorAll('.page'));
    let mainScroll = 0;

    const showSection = (id) => {
      const target = document.getElementById(id) ? id : 'mainPage';
      const current = pages.find((page) => page.style.display !== 'none');
      if (current && current.id === 'mainPage') {
        mainScroll = window.scrollY;
      }
      pages.forEach((page) => {
        page.style.display = page.id === target ? 'flex' : 'none';
      });
      window.scrollTo(0, target === 'mainPage' ? mainScroll : 0);
      history.replaceState(null, '', target === 'mainPage' ? '/' : target === 'members-detail' ? '/members' : `/events/${target}`);
    };

    document.querySelectorAll('[data-section]').forEach((link) => {
      link.addEventListener('click', (event) => {
        event.preventDefault();
        showSection(link.dataset.section);
      });
    });

    const applySlots = (section, slots) => {
      slots.forEach((slot) => {
        const button = section.querySelector(`[data-slot="${slot.key}"]`);
        if (!button) {
          return;
        }
        const bookable = slot.state === 'available' || slot.state === 'one-left';
        button.classList.remove('available', 'booked', 'passed');
        button.classList.add(slot.state === 'full' ? 'booked' : slot.state === 'passed' ? 'passed' : 'available');
        if (!bookable) {
          button.classList.remove('selected');
        }
        button.dataset.state = slot.state;
        button.disabled = !bookable;
        button.querySelector('small').textContent =
          slot.state === 'full' ? 'Full' : slot.state === 'passed' ? 'Time passed' : `${slot.remaining} spot${slot.remaining === 1 ? '' : 's'} ${slot.remaining === 1 ? 'left' : 'open'}`;
      });
    };

    const refresh = async (section, sync) => {
      const id = section.dataset.event;
      if (sync) {
        await fetch(`/api/events/${id}/sync`, { method: 'POST' }).catch(() => null);
      }
      const res = await fetch(`/api/events/${id}/slots`);
      if (res.ok) {
        applySlots(section, (await res.json()).slots);
      }
    };

    document.querySelectorAll('.page.event').forEach((section) => {
      const slotInput = section.querySelector('form.register input[name="slot"]');
      section.querySelectorAll('.slot').forEach((button) => {
        button.addEventListener('click', () => {
          section.querySelectorAll('.slot.selected').forEach((other) => other.classList.remove('selected'));
          button.classList.add('selected');
          slotInput.value = button.dataset.slot;
        });
      });
      setInterval(() => refresh(section, false).catch(() => null), 30000);
    });

    const refreshVisible = () => {
      document.querySelectorAll('.page.event').forEach((section) => {
        if (section.style.display !== 'none') {
          refresh(section, true).catch(() => null);
        }
      });
    };
    document.addEventListener('visibilitychange', () => {
      if (document.visibilityState === 'visible') {
        refreshVisible();
      }
    });
    window.addEventListener('focus', refreshVisible);

    const toast = document.getElementById('toast');
    if (toast) {
      setTimeout(() => {
        toast.style.opacity = '0';
      }, 3500);
    }
  </script>
</body>
</html>
"#;
