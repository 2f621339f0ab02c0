use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use quotebook_backend_client::RemoteEntity;
use quotebook_core::CollectionController;
use quotebook_core::Config;
use quotebook_core::LoadOutcome;
use quotebook_core::Session;
use quotebook_core::StoryView;
use quotebook_core::ThemeView;
use quotebook_protocol::EntityId;
use quotebook_protocol::ImageFormat;
use quotebook_protocol::ImageUpload;
use quotebook_protocol::Story;
use quotebook_protocol::StoryDraft;
use quotebook_protocol::Theme;
use quotebook_protocol::ThemeDraft;
use quotebook_protocol::UserId;
use quotebook_protocol::Visibility;
use std::path::Path;
use tracing::debug;

use crate::Cli;
use crate::Command;
use crate::StoriesArgs;
use crate::StoryCommand;
use crate::StoryFields;
use crate::StoryListView;
use crate::ThemeCommand;
use crate::ThemeFields;
use crate::ThemeListView;
use crate::ThemesArgs;
use crate::logging;

pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config_overrides()).context("failed to load configuration")?;
    let _log_guard = logging::init(&config.quotebook_home, cli.log_file);
    debug!("loaded configuration: {config:?}");

    let session = Session::new(config).context("failed to initialise session")?;
    match cli.command {
        Command::Login { email, password } => {
            let account = session.auth().sign_in(&email, &password).await?;
            let name = account.nickname.unwrap_or_else(|| account.id.to_string());
            println!("Signed in as {name}.");
        }
        Command::Logout => {
            session.auth().sign_out().await?;
            println!("Signed out.");
        }
        Command::Status => match session.auth().current_user() {
            Some(user) => println!("Signed in as {user}."),
            None => println!("Not signed in."),
        },
        Command::Stories(args) => list_stories(&session, args).await?,
        Command::Themes(args) => list_themes(&session, args).await?,
        Command::Story(command) => story_command(&session, command).await?,
        Command::Theme(command) => theme_command(&session, command).await?,
    }
    Ok(())
}

async fn list_stories(session: &Session, args: StoriesArgs) -> Result<()> {
    let view = match args.view.unwrap_or(StoryListView::Public) {
        StoryListView::Public => StoryView::Public,
        StoryListView::Mine => StoryView::Mine(session.current_user()?),
        StoryListView::Author { user_id } => StoryView::Author(UserId::new(user_id)),
        StoryListView::Keyword { text } => StoryView::Keyword(text),
        StoryListView::Theme { theme_id } => StoryView::Theme(EntityId::new(theme_id)),
    };
    let stories = session.stories(view);
    for story in load_pages(&stories, args.pages).await? {
        println!("{}", story_line(&story));
    }
    Ok(())
}

async fn list_themes(session: &Session, args: ThemesArgs) -> Result<()> {
    let view = match args.view.unwrap_or(ThemeListView::Public) {
        ThemeListView::Public => ThemeView::Public,
        ThemeListView::Mine => ThemeView::Mine(session.current_user()?),
        ThemeListView::Author { user_id } => ThemeView::Author(UserId::new(user_id)),
    };
    let themes = session.themes(view);
    for theme in load_pages(&themes, args.pages).await? {
        println!("{}", theme_line(&theme));
    }
    Ok(())
}

async fn load_pages<E: RemoteEntity>(
    controller: &CollectionController<E>,
    pages: u32,
) -> Result<Vec<E>> {
    for _ in 0..pages.max(1) {
        match controller.load_next().await {
            LoadOutcome::Loaded { .. } => {}
            LoadOutcome::Skipped | LoadOutcome::Cancelled => break,
            LoadOutcome::Failed(err) => {
                return Err(err).with_context(|| format!("failed to list {}", controller.view()));
            }
        }
    }
    let state = controller.state();
    if state.items.is_empty() {
        eprintln!("No {} found.", controller.view());
    } else if !state.is_last_page {
        eprintln!("More available; pass --pages to fetch further.");
    }
    Ok(state.items)
}

async fn story_command(session: &Session, command: StoryCommand) -> Result<()> {
    match command {
        StoryCommand::Show { id } => {
            let story = session
                .stories(StoryView::Public)
                .fetch_one(&EntityId::new(id))
                .await?;
            print_story(&story);
        }
        StoryCommand::Create(fields) => {
            let story = session.my_stories()?.create(&story_draft(fields)?).await?;
            println!("Created story {}.", story.id);
        }
        StoryCommand::Update { id, fields } => {
            let story = session
                .my_stories()?
                .update(&EntityId::new(id), &story_draft(fields)?)
                .await?;
            println!("Updated story {}.", story.id);
        }
        StoryCommand::Delete { id } => {
            let id = EntityId::new(id);
            session.my_stories()?.delete(&id).await?;
            println!("Deleted story {id}.");
        }
    }
    Ok(())
}

async fn theme_command(session: &Session, command: ThemeCommand) -> Result<()> {
    match command {
        ThemeCommand::Create(fields) => {
            let theme = session.my_themes()?.create(&theme_draft(fields)?).await?;
            println!("Created theme {}.", theme.id);
        }
        ThemeCommand::Update { id, fields } => {
            let theme = session
                .my_themes()?
                .update(&EntityId::new(id), &theme_draft(fields)?)
                .await?;
            println!("Updated theme {}.", theme.id);
        }
        ThemeCommand::Delete { id } => {
            let id = EntityId::new(id);
            session.my_themes()?.delete(&id).await?;
            println!("Deleted theme {id}.");
        }
    }
    Ok(())
}

fn visibility(private: bool) -> Visibility {
    if private {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

fn story_draft(fields: StoryFields) -> Result<StoryDraft> {
    Ok(StoryDraft {
        title: fields.title,
        quote: fields.quote,
        book_title: fields.book_title,
        book_author: fields.book_author,
        keywords: fields.keywords,
        theme_id: fields.theme.map(EntityId::new),
        visibility: visibility(fields.private),
        image: fields.image.as_deref().map(read_image).transpose()?,
    })
}

fn theme_draft(fields: ThemeFields) -> Result<ThemeDraft> {
    Ok(ThemeDraft {
        name: fields.name,
        description: fields.description,
        visibility: visibility(fields.private),
        cover_image: fields.cover.as_deref().map(read_image).transpose()?,
    })
}

fn read_image(path: &Path) -> Result<ImageUpload> {
    let Some(format) = path
        .extension()
        .and_then(|extension| extension.to_str())
        .and_then(ImageFormat::from_extension)
    else {
        bail!("{} is not a jpeg, png, webp or heic image", path.display());
    };
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut upload = ImageUpload::new(bytes, format);
    if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
        upload.file_name = name.to_string();
    }
    Ok(upload)
}

fn story_line(story: &Story) -> String {
    let lock = if story.visibility.is_public() { "" } else { " [private]" };
    format!("{}  {} ({}){lock}", story.id, story.title, story.book_title)
}

fn theme_line(theme: &Theme) -> String {
    let lock = if theme.visibility.is_public() { "" } else { " [private]" };
    format!(
        "{}  {} ({} stories){lock}",
        theme.id, theme.name, theme.story_count
    )
}

fn print_story(story: &Story) {
    println!("{}", story.title);
    println!();
    println!("  \"{}\"", story.quote);
    match &story.book_author {
        Some(author) => println!("  from {} by {author}", story.book_title),
        None => println!("  from {}", story.book_title),
    }
    if !story.keywords.is_empty() {
        println!("  keywords: {}", story.keywords.join(", "));
    }
    let by = story
        .owner_nickname
        .clone()
        .unwrap_or_else(|| story.owner_id.to_string());
    println!("  posted by {by} ({})", story.visibility.as_str());
}
