use clap::Parser;

#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about, long_about = None)]
pub enum VdiskCli {
    /// create a new volume image
    Mkfs(MkfsArgs),
    /// show geometry and space usage of an image
    Info(ImageArgs),
    /// create a directory inside an image
    Mkdir(PathArgs),
    /// list the children of a directory
    List(PathArgs),
    /// copy a host file into an image
    Put(PutArgs),
    /// copy a file out of an image into a host file
    Get(GetArgs),
    /// delete a file from an image
    Remove(PathArgs),
}

/// make a new volume image subcommand
#[derive(clap::Args, Debug, PartialEq)]
#[command(about = "make a new volume image")]
pub struct MkfsArgs {
    /// the path of the image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the total size of the image in bytes
    #[clap(short, long)]
    pub size: i64,
    /// the block size of the volume
    #[clap(short, long)]
    pub block_size: u16,
    /// bytes of metadata kept per node
    #[clap(short, long, default_value_t = 12)]
    pub file_info_size: u8,
    /// the on-image name field width in bytes
    #[clap(short, long, default_value_t = 24)]
    pub name_length: u8,
}

#[derive(clap::Args, Debug, PartialEq)]
pub struct ImageArgs {
    /// the path of the image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
}

#[derive(clap::Args, Debug, PartialEq)]
pub struct PathArgs {
    /// the path of the image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the path inside the volume, e.g. V:\configs
    #[clap(short = 'd', long)]
    pub path: String,
}

#[derive(clap::Args, Debug, PartialEq)]
pub struct PutArgs {
    /// the path of the image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the host file to copy in
    #[clap(short = 's', long)]
    pub host_file: String,
    /// the destination path inside the volume
    #[clap(short = 'd', long)]
    pub path: String,
}

#[derive(clap::Args, Debug, PartialEq)]
pub struct GetArgs {
    /// the path of the image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the source path inside the volume
    #[clap(short = 's', long)]
    pub path: String,
    /// the host file to write
    #[clap(short = 'd', long)]
    pub host_file: String,
}
