use clap::Parser;
use vdisk::cli_interface::VdiskCli;
use vdisk::utils::size_display::display_size;
use vdisk::Volume;

/// A CLI to create volume images and move files and directories in and out
/// of them. Every subcommand opens the image, performs one operation and
/// flushes the image back on exit.
fn main() -> anyhow::Result<()> {
    env_logger::builder().format_timestamp_nanos().init();
    let args = VdiskCli::parse();
    match args {
        VdiskCli::Mkfs(args) => {
            let volume = vdisk::mkfs::mkfs(
                &args.image_file_path,
                args.size,
                args.block_size,
                args.file_info_size,
                args.name_length,
            )?;
            println!(
                "created {} with {} of usable space",
                args.image_file_path,
                display_size(volume.total_space())
            );
        }
        VdiskCli::Info(args) => {
            let volume = Volume::open(&args.image_file_path)?;
            let geometry = volume.geometry();
            println!("block size   : {}", geometry.block_size());
            println!("block count  : {}", geometry.block_count());
            println!("pointer size : {}", geometry.pointer_size());
            println!("node entries : {}", geometry.node_table_entry_count());
            println!("name length  : {}", geometry.max_name_length());
            println!("total space  : {}", display_size(volume.total_space()));
            println!("free space   : {}", display_size(volume.free_space()));
        }
        VdiskCli::Mkdir(args) => {
            let mut volume = Volume::open(&args.image_file_path)?;
            if volume.create_directory(&args.path)? {
                println!("created {}", args.path);
            } else {
                println!("{} already exists", args.path);
            }
        }
        VdiskCli::List(args) => {
            let volume = Volume::open(&args.image_file_path)?;
            for dir_path in volume.list_subdirectories(&args.path)? {
                println!("     <DIR> {}", dir_path);
            }
            for file_path in volume.list_files(&args.path)? {
                let handle = volume.get_file(&file_path)?;
                println!("{:>10} {}", display_size(handle.size), file_path);
            }
        }
        VdiskCli::Put(args) => {
            let data = std::fs::read(&args.host_file)?;
            let mut volume = Volume::open(&args.image_file_path)?;
            volume.write_file_bytes(&args.path, &data)?;
            println!("wrote {} to {}", display_size(data.len() as u64), args.path);
        }
        VdiskCli::Get(args) => {
            let volume = Volume::open(&args.image_file_path)?;
            let data = volume.read_file_bytes(&args.path)?;
            std::fs::write(&args.host_file, &data)?;
            println!(
                "read {} from {}",
                display_size(data.len() as u64),
                args.path
            );
        }
        VdiskCli::Remove(args) => {
            let mut volume = Volume::open(&args.image_file_path)?;
            volume.delete_file(&args.path)?;
            println!("deleted {}", args.path);
        }
    }
    Ok(())
}
