use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use videoknife::config::Config;
use videoknife::crop::{CropOutcome, CropRect, FrameRange};
use videoknife::export::{default_file_name, export_table, ExportFormat, ExportTable};
use videoknife::{logging, Album};

enum Command {
    AddVideo { path: PathBuf, move_file: bool },
    AddVideos { dir: PathBuf, move_files: bool },
    RemoveVideo { id: i64 },
    AddCrop {
        video_id: i64,
        range: FrameRange,
        rect: Option<CropRect>,
        description: String,
    },
    RemoveCrop { id: i64 },
    Crop { id: i64 },
    CropAll,
    List { what: String, video: Option<i64>, crop: Option<i64> },
    Info { video_id: i64 },
    Export { table: ExportTable, format: ExportFormat, output: PathBuf },
}

struct Options {
    config_path: Option<PathBuf>,
    album_dir: Option<PathBuf>,
    command: Command,
}

fn parse_args() -> Result<Options> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config_path = None;
    let mut album_dir = None;
    let mut rest = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("videoknife {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                config_path = Some(PathBuf::from(value(&args, &mut i, "--config")?));
            }
            "--album" | "-a" => {
                album_dir = Some(PathBuf::from(value(&args, &mut i, "--album")?));
            }
            _ => rest.push(args[i].clone()),
        }
        i += 1;
    }

    let command = parse_command(&rest)?;
    Ok(Options {
        config_path,
        album_dir,
        command,
    })
}

/// Consume the value following the flag at `args[*i]`.
fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    match args.get(*i) {
        Some(v) => Ok(v.as_str()),
        None => bail!("{} requires an argument", flag),
    }
}

fn int(arg: &str, what: &str) -> Result<i64> {
    arg.parse()
        .with_context(|| format!("{} must be an integer, got {:?}", what, arg))
}

fn parse_rect(arg: &str) -> Result<CropRect> {
    let parts = arg
        .split(',')
        .map(|p| int(p.trim(), "rectangle coordinate"))
        .collect::<Result<Vec<i64>>>()?;
    match parts.as_slice() {
        [left, top, right, bottom] => Ok(CropRect::new(*left, *top, *right, *bottom)),
        _ => bail!("--rect expects LEFT,TOP,RIGHT,BOTTOM, got {:?}", arg),
    }
}

fn parse_command(args: &[String]) -> Result<Command> {
    let Some((name, args)) = args.split_first() else {
        print_help();
        std::process::exit(1);
    };

    let mut positional = Vec::new();
    let mut move_file = false;
    let mut rect = None;
    let mut description = String::new();
    let mut video = None;
    let mut crop = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--move" => move_file = true,
            "--rect" => rect = Some(parse_rect(value(args, &mut i, "--rect")?)?),
            "--description" => description = value(args, &mut i, "--description")?.to_string(),
            "--video" => video = Some(int(value(args, &mut i, "--video")?, "--video")?),
            "--crop" => crop = Some(int(value(args, &mut i, "--crop")?, "--crop")?),
            flag if flag.starts_with("--") => bail!("Unknown option for {}: {}", name, flag),
            other => positional.push(other),
        }
        i += 1;
    }

    let expect = |n: usize, usage: &str| -> Result<()> {
        if positional.len() != n {
            bail!("Usage: videoknife {} {}", name, usage);
        }
        Ok(())
    };

    let command = match name.as_str() {
        "add-video" => {
            expect(1, "PATH [--move]")?;
            Command::AddVideo {
                path: PathBuf::from(positional[0]),
                move_file,
            }
        }
        "add-videos" => {
            expect(1, "DIR [--move]")?;
            Command::AddVideos {
                dir: PathBuf::from(positional[0]),
                move_files: move_file,
            }
        }
        "remove-video" => {
            expect(1, "ID")?;
            Command::RemoveVideo {
                id: int(positional[0], "ID")?,
            }
        }
        "add-crop" => {
            expect(4, "VIDEO_ID START END STEP [--rect L,T,R,B] [--description TEXT]")?;
            Command::AddCrop {
                video_id: int(positional[0], "VIDEO_ID")?,
                range: FrameRange::new(
                    int(positional[1], "START")?,
                    int(positional[2], "END")?,
                    int(positional[3], "STEP")?,
                ),
                rect,
                description,
            }
        }
        "remove-crop" => {
            expect(1, "ID")?;
            Command::RemoveCrop {
                id: int(positional[0], "ID")?,
            }
        }
        "crop" => {
            expect(1, "ID")?;
            Command::Crop {
                id: int(positional[0], "ID")?,
            }
        }
        "crop-all" => {
            expect(0, "")?;
            Command::CropAll
        }
        "list" => {
            if positional.len() > 1 {
                bail!("Usage: videoknife list [videos|crops|images] [--video ID] [--crop ID]");
            }
            Command::List {
                what: positional.first().unwrap_or(&"videos").to_string(),
                video,
                crop,
            }
        }
        "info" => {
            expect(1, "VIDEO_ID")?;
            Command::Info {
                video_id: int(positional[0], "VIDEO_ID")?,
            }
        }
        "export" => {
            if !(2..=3).contains(&positional.len()) {
                bail!("Usage: videoknife export videos|crops|images json|csv [OUTPUT]");
            }
            let table = positional[0].parse()?;
            let format = positional[1].parse()?;
            let output = match positional.get(2) {
                Some(path) => PathBuf::from(*path),
                None => PathBuf::from(default_file_name(table, format)),
            };
            Command::Export {
                table,
                format,
                output,
            }
        }
        other => bail!("Unknown command: {} (see --help)", other),
    };
    Ok(command)
}

fn print_help() {
    println!(
        r#"videoknife - cut still images out of a video album

USAGE:
    videoknife [OPTIONS] COMMAND [ARGS]

COMMANDS:
    add-video PATH [--move]             Import one video
    add-videos DIR [--move]             Import every video directly inside DIR
    remove-video ID                     Remove a video with its crops and images
    add-crop VIDEO_ID START END STEP    Define frames to extract
        [--rect L,T,R,B]                  Region to keep (default: full frame)
        [--description TEXT]
    remove-crop ID                      Remove a crop definition and its images
    crop ID                             Extract the images of one crop definition
    crop-all                            Extract every pending crop definition
    list [videos|crops|images]          List catalog entries
        [--video ID] [--crop ID]          Filter by video or crop definition
    info VIDEO_ID                       Show stream properties of a video
    export videos|crops|images json|csv [OUTPUT]
                                        Default OUTPUT: <table>.<json|csv>

OPTIONS:
    --album, -a DIR     Album directory (overrides config)
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    VIDEOKNIFE_CONFIG   Path to config file (overrides default location)
    VIDEOKNIFE_LOG      Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/videoknife/config.toml"#
    );
}

fn main() -> Result<()> {
    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let _ = logging::init(Some(Config::config_dir().join("logs")));

    let config = match &options.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let album_dir = options.album_dir.unwrap_or_else(|| config.album_dir.clone());
    let mut album = Album::open(&album_dir, &config)
        .with_context(|| format!("Failed to open album at {}", album_dir.display()))?;

    run(&mut album, &config, options.command)
}

fn run(album: &mut Album, config: &Config, command: Command) -> Result<()> {
    match command {
        Command::AddVideo { path, move_file } => {
            let id = album.add_video(&path, move_file || config.import.move_files)?;
            println!("Added video {}", id);
        }
        Command::AddVideos { dir, move_files } => {
            let report = album.add_videos_from_dir(
                &dir,
                &config.import.video_extensions,
                move_files || config.import.move_files,
            )?;
            for (path, id) in &report.added {
                println!("Added video {} from {}", id, path.display());
            }
            for (path, e) in &report.failed {
                eprintln!("Failed {}: {}", path.display(), e);
            }
        }
        Command::RemoveVideo { id } => {
            album.remove_video(id)?;
            println!("Removed video {}", id);
        }
        Command::AddCrop {
            video_id,
            range,
            rect,
            description,
        } => {
            let id = album.add_crop_definition(video_id, range, rect, &description)?;
            println!("Added crop definition {}", id);
        }
        Command::RemoveCrop { id } => {
            album.remove_crop_definition(id)?;
            println!("Removed crop definition {}", id);
        }
        Command::Crop { id } => print_outcome(id, album.do_crop(id)?),
        Command::CropAll => {
            let report = album.do_crop_all()?;
            for (id, outcome) in &report.completed {
                print_outcome(*id, *outcome);
            }
            for (id, e) in &report.failed {
                eprintln!("Crop definition {} failed: {}", id, e);
            }
            if !report.is_success() {
                bail!("{} crop definitions failed", report.failed.len());
            }
        }
        Command::List { what, video, crop } => list(album, &what, video, crop)?,
        Command::Info { video_id } => {
            let info = album.video_info(video_id)?;
            println!("Size:        {}x{}", info.width, info.height);
            println!("Frames:      {}", info.frame_count);
            match info.frame_rate {
                Some(fps) => println!("Frame rate:  {:.3}", fps),
                None => println!("Frame rate:  unknown"),
            }
        }
        Command::Export {
            table,
            format,
            output,
        } => {
            let count = export_table(album, table, format, &output)?;
            println!("Exported {} rows to {}", count, output.display());
        }
    }
    Ok(())
}

fn print_outcome(id: i64, outcome: CropOutcome) {
    match outcome {
        CropOutcome::AlreadyDone => println!("Crop definition {} already done", id),
        CropOutcome::Extracted { images, skipped } if skipped > 0 => println!(
            "Crop definition {}: {} images, {} unreadable frames skipped",
            id, images, skipped
        ),
        CropOutcome::Extracted { images, .. } => {
            println!("Crop definition {}: {} images", id, images)
        }
    }
}

fn list(album: &Album, what: &str, video: Option<i64>, crop: Option<i64>) -> Result<()> {
    match what {
        "videos" => {
            for v in album.videos()? {
                println!("{:>6}  {}  {}", v.id, v.added_at, v.name);
            }
        }
        "crops" => {
            let definitions = match video {
                Some(id) => album.crop_definitions_for_video(id)?,
                None => album.crop_definitions()?,
            };
            for d in definitions {
                let rect = d.rect.map(|r| r.to_string()).unwrap_or_else(|| "full".into());
                println!(
                    "{:>6}  video {:<6} {}  {}  {}  {}",
                    d.id,
                    d.video_id,
                    if d.done { "done   " } else { "pending" },
                    d.range,
                    rect,
                    d.description
                );
            }
        }
        "images" => {
            let images = match (crop, video) {
                (Some(id), _) => album.images_for_definition(id)?,
                (None, Some(id)) => album.images_for_video(id)?,
                (None, None) => album.images()?,
            };
            for image in images {
                println!("{:>6}  {}", image.id, album.image_path(&image).display());
            }
        }
        other => bail!("Unknown list target: {} (videos, crops or images)", other),
    }
    Ok(())
}
