use crate::infra::{in_memory_service, InMemoryMatchingService};
use chrono::Local;
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use study_match::config::MatchingConfig;
use study_match::error::AppError;
use study_match::matching::scoring::breakdown;
use study_match::matching::{
    rank, ConnectOutcome, LearningStyle, NewMessage, PreferredSchedule, ProfileUpdate,
    ScoredCandidate, Uid,
};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Student whose matches are shown
    #[arg(long, default_value = "ana")]
    pub(crate) viewer: String,
    /// Number of candidates to draw
    #[arg(long, default_value_t = 5)]
    pub(crate) count: usize,
    /// Seed the candidate shuffle for reproducible output
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Print a JSON summary instead of the narrated walk-through
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Serialize)]
struct DemoSummary {
    viewer: Uid,
    matches: Vec<ScoredCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    connect: Option<ConnectOutcome>,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        viewer,
        count,
        seed,
        json,
    } = args;
    let viewer = Uid::new(viewer);

    let service = in_memory_service(MatchingConfig::default());
    seed_cohort(&service).await?;

    let me = service.profiles().get_profile(&viewer).await?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let drawn = service
        .selector()
        .select_candidates_with(&viewer, count, &mut rng)
        .await?;
    let matches = rank(&me, drawn);

    if !json {
        println!("Study match demo ({})", Local::now().format("%Y-%m-%d %H:%M"));
        println!(
            "\nTop {} candidates for {} ({}, year {})",
            matches.len(),
            me.name,
            me.major,
            me.years_of_study
        );
        for candidate in &matches {
            println!(
                "- {} [{}] {}% match",
                candidate.profile.name, candidate.profile.uid, candidate.match_percent
            );
            for component in breakdown(&me, &candidate.profile).components {
                if component.points > 0.0 {
                    println!("    {:?}: +{:.1}", component.factor, component.points);
                }
            }
        }
    }

    if matches.is_empty() {
        if json {
            print_json(&DemoSummary {
                viewer,
                matches,
                connect: None,
            });
        } else {
            println!("\nNo candidates left to connect with.");
        }
        return Ok(());
    }
    let partner = matches[0].profile.uid.clone();

    let first = service.connect(&viewer, &partner).await?;
    let outcome = service.connect(&partner, &viewer).await?;

    if json {
        print_json(&DemoSummary {
            viewer,
            matches,
            connect: Some(outcome),
        });
        return Ok(());
    }

    println!("\nMutual-match walk-through");
    println!("- {viewer} connects with {partner}: matched={}", first.matched);
    println!(
        "- {partner} connects back: matched={} thread={}",
        outcome.matched,
        outcome
            .thread_id
            .as_ref()
            .map(|id| id.as_str())
            .unwrap_or("none")
    );

    service
        .chat()
        .post_message(
            &viewer,
            partner.as_str(),
            NewMessage {
                text: "Want to review for the midterm this week?".to_string(),
                attachments: Vec::new(),
            },
        )
        .await?;
    let view = service.chat().open_thread(&partner, viewer.as_str()).await?;
    println!("  Thread {} ({} members)", view.thread.id, view.thread.users.len());
    for message in &view.messages {
        println!(
            "    [{}] {}: {}",
            message.created_at.format("%H:%M"),
            message.sender_uid,
            message.text
        );
    }

    let remaining = service.top_matches(&viewer, Some(count)).await?;
    println!(
        "- {} is no longer offered to {viewer}; {} candidates remain",
        partner,
        remaining.len()
    );

    Ok(())
}

fn print_json(summary: &DemoSummary) {
    match serde_json::to_string_pretty(summary) {
        Ok(json) => println!("{}", json),
        Err(err) => println!("Demo summary unavailable: {}", err),
    }
}

fn student(
    name: &str,
    major: &str,
    year: &str,
    subjects: &[&str],
    schedule: PreferredSchedule,
    style: LearningStyle,
) -> ProfileUpdate {
    ProfileUpdate {
        name: name.to_string(),
        major: major.to_string(),
        years_of_study: year.to_string(),
        description: format!("{name} is looking for a study partner"),
        current_subjects: subjects.iter().map(|code| code.to_string()).collect(),
        preferred_schedule: Some(schedule),
        learning_style: Some(style),
        avatar_image: None,
    }
}

async fn seed_cohort(service: &InMemoryMatchingService) -> Result<(), AppError> {
    let cohort = [
        student(
            "Ana",
            "Computer Science",
            "2",
            &["CS101", "MATH200"],
            PreferredSchedule::WeekdayEarlyEvening,
            LearningStyle::Visual,
        ),
        student(
            "Ben",
            "computer science",
            "2",
            &["CS101", "MATH200", "PHYS150"],
            PreferredSchedule::WeekdayEarlyEvening,
            LearningStyle::Visual,
        ),
        student(
            "Cleo",
            "History",
            "1",
            &["HIST110", "ENG101"],
            PreferredSchedule::WeekendMorning,
            LearningStyle::Auditory,
        ),
        student(
            "Dev",
            "Physics",
            "3",
            &["MATH200", "PHYS150"],
            PreferredSchedule::WeekdayLateEvening,
            LearningStyle::Kinesthetic,
        ),
        student(
            "Eun",
            "Mathematics",
            "2",
            &["MATH200"],
            PreferredSchedule::Flexible,
            LearningStyle::Visual,
        ),
        student(
            "Finn",
            "Biology",
            "4",
            &["BIO101", "CHEM110"],
            PreferredSchedule::WeekendAfternoon,
            LearningStyle::Auditory,
        ),
    ];

    for update in cohort {
        let uid = Uid::new(update.name.to_lowercase());
        service.start_session(&uid).await?;
        service.profiles().update_profile(&uid, update).await?;
    }
    Ok(())
}
